//! HTML table scraper.
//!
//! Fetches an HTML page, locates a `<table>` element via CSS selector, and
//! extracts each row into a [`serde_json::Value`] object keyed by the column
//! headers.
//!
//! Reference-style statistical tables often carry the row label in a `<th>`
//! cell at the start of each body row and decorate values with footnote
//! references. Both are handled here so that callers receive plain cell text.

use std::collections::BTreeMap;

use scraper::{Html, Selector};

use crate::{ScrapeError, ScrapedTable, Scraper, build_client};

/// Scraper that extracts records from an HTML table.
///
/// The default selectors work with standard `<table>` / `<thead>` / `<tbody>`
/// markup. Use the builder methods to customise selectors for non-standard
/// layouts.
#[derive(Debug, Clone)]
pub struct HtmlTableScraper {
    /// The URL of the page containing the table.
    url: String,
    /// Additional HTTP headers to include in the request.
    headers: BTreeMap<String, String>,
    /// CSS selector for the target table element.
    table_selector: String,
    /// CSS selector for header cells inside the table.
    header_row_selector: String,
    /// CSS selector for body rows inside the table.
    body_row_selector: String,
    /// CSS selector for cells within a body row.
    cell_selector: String,
    /// Whether `<th>` row-label cells inside body rows count as cells.
    include_row_headers: bool,
    /// Whether `[1]`-style footnote references are stripped from cell text.
    strip_footnotes: bool,
}

impl HtmlTableScraper {
    /// Creates a new `HtmlTableScraper` for the given URL with default CSS
    /// selectors.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            headers: BTreeMap::new(),
            table_selector: "table".to_owned(),
            header_row_selector: "thead tr th, thead tr td".to_owned(),
            body_row_selector: "tbody tr".to_owned(),
            cell_selector: "td".to_owned(),
            include_row_headers: false,
            strip_footnotes: true,
        }
    }

    /// Overrides the CSS selector used to locate the table element.
    #[must_use]
    pub fn with_table_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.table_selector);
        self
    }

    /// Overrides the CSS selector used to locate header cells.
    #[must_use]
    pub fn with_header_row_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.header_row_selector);
        self
    }

    /// Overrides the CSS selector used to locate body rows.
    #[must_use]
    pub fn with_body_row_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.body_row_selector);
        self
    }

    /// Overrides the CSS selector used to locate cells within a body row.
    #[must_use]
    pub fn with_cell_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.cell_selector);
        self
    }

    /// Includes `<th>` row-label cells inside body rows as leading cells.
    #[must_use]
    pub const fn with_row_headers(mut self, include: bool) -> Self {
        self.include_row_headers = include;
        self
    }

    /// Controls whether `[1]`-style footnote references are stripped from
    /// cell text.
    #[must_use]
    pub const fn with_footnote_stripping(mut self, strip: bool) -> Self {
        self.strip_footnotes = strip;
        self
    }

    /// Adds an HTTP header to include in the request.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Parses a CSS selector string, returning a [`ScrapeError`] on failure.
    fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
        Selector::parse(selector)
            .map_err(|e| ScrapeError::Parse(format!("invalid CSS selector '{selector}': {e}")))
    }

    /// Extracts cleaned text from an element: text nodes concatenated,
    /// footnote references optionally removed, whitespace collapsed.
    fn cell_text(element: scraper::ElementRef<'_>, strip_footnotes: bool) -> String {
        let raw = element.text().collect::<Vec<_>>().join("");
        let raw = if strip_footnotes {
            strip_footnote_refs(&raw)
        } else {
            raw
        };
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Parses the table out of an already-fetched HTML document.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Parse`] if a selector is invalid, no table
    /// matches, or the table has no header cells.
    pub fn parse_table(&self, body: &str) -> Result<ScrapedTable, ScrapeError> {
        let document = Html::parse_document(body);

        // ── Locate the table ────────────────────────────────────────────
        let table_sel = Self::parse_selector(&self.table_selector)?;
        let table_element = document.select(&table_sel).next().ok_or_else(|| {
            ScrapeError::Parse(format!(
                "no element matching '{}' found in response",
                self.table_selector
            ))
        })?;

        // ── Extract headers ─────────────────────────────────────────────
        let header_sel = Self::parse_selector(&self.header_row_selector)?;
        let headers: Vec<String> = table_element
            .select(&header_sel)
            .map(|el| Self::cell_text(el, self.strip_footnotes))
            .collect();

        if headers.is_empty() {
            return Err(ScrapeError::Parse(
                "no header cells found in table".to_owned(),
            ));
        }

        // ── Extract body rows ───────────────────────────────────────────
        let row_sel = Self::parse_selector(&self.body_row_selector)?;
        let effective_cell_selector = if self.include_row_headers {
            format!("th, {}", self.cell_selector)
        } else {
            self.cell_selector.clone()
        };
        let cell_sel = Self::parse_selector(&effective_cell_selector)?;

        let mut records: Vec<serde_json::Value> = Vec::new();

        for row in table_element.select(&row_sel) {
            let cells: Vec<String> = row
                .select(&cell_sel)
                .map(|el| Self::cell_text(el, self.strip_footnotes))
                .collect();

            // Rows with no matching cells (header rows nested inside the
            // body, spacer rows) carry no data.
            if cells.is_empty() {
                continue;
            }

            let mut map = serde_json::Map::new();
            for (i, header) in headers.iter().enumerate() {
                let value = cells.get(i).cloned().unwrap_or_default();
                map.insert(header.clone(), serde_json::Value::String(value));
            }

            records.push(serde_json::Value::Object(map));
        }

        Ok(ScrapedTable { headers, records })
    }
}

impl Scraper for HtmlTableScraper {
    async fn fetch(&self) -> Result<ScrapedTable, ScrapeError> {
        let client = build_client(&self.headers)?;

        log::debug!("Fetching HTML table from {}", self.url);

        let response = client.get(&self.url).send().await?.error_for_status()?;
        let body = response.text().await?;

        self.parse_table(&body)
    }

    fn strategy(&self) -> &'static str {
        "html_table"
    }
}

/// Removes `[N]`-style footnote references where `N` is all digits.
///
/// Other bracketed text is left untouched.
fn strip_footnote_refs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('[') {
        let (before, after) = rest.split_at(start);
        out.push_str(before);

        if let Some(end) = after.find(']') {
            let inner = &after[1..end];
            if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                rest = &after[end + 1..];
                continue;
            }
        }

        out.push('[');
        rest = &after[1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const WARD_TABLE: &str = r#"
        <html><body>
        <table class="wikitable">
          <thead>
            <tr><th>Name</th><th>Density[1]</th></tr>
          </thead>
          <tbody>
            <tr><th>Adachi</th><td>12,000[2]</td></tr>
            <tr><th>Arakawa</th><td>
                21,500
            </td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn strips_numeric_footnote_refs_only() {
        assert_eq!(strip_footnote_refs("12,000[2]"), "12,000");
        assert_eq!(strip_footnote_refs("[1]237[12]"), "237");
        assert_eq!(strip_footnote_refs("a [note] b"), "a [note] b");
        assert_eq!(strip_footnote_refs("open[3"), "open[3");
    }

    #[test]
    fn parses_row_header_cells_when_enabled() {
        let scraper = HtmlTableScraper::new("http://unused.invalid").with_row_headers(true);
        let table = scraper.parse_table(WARD_TABLE).unwrap();

        assert_eq!(table.headers, vec!["Name", "Density"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["Name"], "Adachi");
        assert_eq!(table.records[0]["Density"], "12,000");
        assert_eq!(table.records[1]["Name"], "Arakawa");
        assert_eq!(table.records[1]["Density"], "21,500");
    }

    #[test]
    fn skips_row_label_without_row_headers() {
        let scraper = HtmlTableScraper::new("http://unused.invalid");
        let table = scraper.parse_table(WARD_TABLE).unwrap();

        // Only the td cell is selected, so the row label never appears.
        assert_eq!(table.records[0]["Name"], "12,000");
        assert_eq!(table.records[0]["Density"], "");
    }

    #[test]
    fn missing_table_is_a_parse_error() {
        let scraper = HtmlTableScraper::new("http://unused.invalid").with_table_selector("table.nope");
        let err = scraper.parse_table(WARD_TABLE).unwrap_err();

        assert!(matches!(err, ScrapeError::Parse(_)));
    }

    #[test]
    fn footnote_stripping_can_be_disabled() {
        let scraper = HtmlTableScraper::new("http://unused.invalid")
            .with_row_headers(true)
            .with_footnote_stripping(false);
        let table = scraper.parse_table(WARD_TABLE).unwrap();

        assert_eq!(table.headers[1], "Density[1]");
        assert_eq!(table.records[0]["Density"], "12,000[2]");
    }
}
