//! Typed access to configured tables.
//!
//! A [`crate::study_def::TableConfig`] names a fetch strategy and a column
//! mapping; this module turns that into `{name, value}` rows. Values stay
//! raw strings here — coercion into densities, prices, and postal codes is
//! the caller's job, where the error policy applies.

use venue_map_scraper::csv_table::CsvTableScraper;
use venue_map_scraper::html_table::HtmlTableScraper;
use venue_map_scraper::{ScrapedTable, Scraper as _};

use crate::SourceError;
use crate::study_def::{ColumnMapping, TableConfig, TableFetcherConfig};

/// One table row after column mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// The place name cell, trimmed.
    pub name: String,
    /// The value cell (density, price, postal code, ...), raw.
    pub value: String,
}

/// Fetches a configured table and maps its records onto `{name, value}`
/// rows, in document order.
///
/// Rows with an empty name cell (spacers, summary separators) are dropped
/// with a debug log; they carry no joinable data.
///
/// # Errors
///
/// Returns [`SourceError`] if fetching fails or a mapped column is missing
/// from the table.
pub async fn fetch_table(config: &TableConfig) -> Result<Vec<TableRow>, SourceError> {
    let table = fetch_raw(&config.fetcher).await?;
    map_rows(&table, &config.columns)
}

/// Runs the configured fetch strategy.
async fn fetch_raw(fetcher: &TableFetcherConfig) -> Result<ScrapedTable, SourceError> {
    match fetcher {
        TableFetcherConfig::HtmlTable {
            url,
            table_selector,
            header_selector,
            row_selector,
            cell_selector,
            row_headers,
            strip_footnotes,
            headers,
        } => {
            let mut scraper = HtmlTableScraper::new(url)
                .with_row_headers(*row_headers)
                .with_footnote_stripping(*strip_footnotes);
            if let Some(selector) = table_selector {
                scraper = scraper.with_table_selector(selector);
            }
            if let Some(selector) = header_selector {
                scraper = scraper.with_header_row_selector(selector);
            }
            if let Some(selector) = row_selector {
                scraper = scraper.with_body_row_selector(selector);
            }
            if let Some(selector) = cell_selector {
                scraper = scraper.with_cell_selector(selector);
            }
            for (key, value) in headers {
                scraper = scraper.with_header(key, value);
            }
            log::info!("Fetching {} from {url}", scraper.strategy());
            Ok(scraper.fetch().await?)
        }
        TableFetcherConfig::CsvFile { path, delimiter } => {
            let mut scraper = CsvTableScraper::from_path(path);
            if let Some(delimiter) = delimiter {
                scraper = scraper.with_delimiter(delimiter_byte(delimiter)?);
            }
            log::info!("Reading {} from {path}", scraper.strategy());
            Ok(scraper.fetch().await?)
        }
        TableFetcherConfig::CsvUrl {
            url,
            delimiter,
            headers,
        } => {
            let mut scraper = CsvTableScraper::from_url(url);
            if let Some(delimiter) = delimiter {
                scraper = scraper.with_delimiter(delimiter_byte(delimiter)?);
            }
            for (key, value) in headers {
                scraper = scraper.with_header(key, value);
            }
            log::info!("Fetching {} from {url}", scraper.strategy());
            Ok(scraper.fetch().await?)
        }
    }
}

/// Maps scraped records onto `{name, value}` rows using the column mapping.
fn map_rows(table: &ScrapedTable, columns: &ColumnMapping) -> Result<Vec<TableRow>, SourceError> {
    for required in [&columns.name, &columns.value] {
        if !table.headers.iter().any(|header| header == required) {
            return Err(SourceError::Parse {
                message: format!(
                    "column '{required}' not found; available columns: {:?}",
                    table.headers
                ),
            });
        }
    }

    let mut rows = Vec::with_capacity(table.records.len());

    for record in &table.records {
        let name = cell(record, &columns.name);
        let value = cell(record, &columns.value);

        if name.is_empty() {
            log::debug!("Skipping row with empty '{}' cell", columns.name);
            continue;
        }

        rows.push(TableRow { name, value });
    }

    Ok(rows)
}

/// Reads one cell from a header-keyed record.
fn cell(record: &serde_json::Value, column: &str) -> String {
    record
        .get(column)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_owned()
}

/// Converts a configured delimiter string into the single byte `csv`
/// expects.
fn delimiter_byte(delimiter: &str) -> Result<u8, SourceError> {
    match delimiter.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(SourceError::Parse {
            message: format!("delimiter must be a single ASCII character, got '{delimiter}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ScrapedTable {
        ScrapedTable {
            headers: vec!["Name".to_owned(), "Density".to_owned()],
            records: vec![
                serde_json::json!({"Name": "Adachi", "Density": "12,000"}),
                serde_json::json!({"Name": "", "Density": ""}),
                serde_json::json!({"Name": "Arakawa", "Density": "21,500"}),
            ],
        }
    }

    #[test]
    fn maps_rows_and_skips_empty_names() {
        let columns = ColumnMapping {
            name: "Name".to_owned(),
            value: "Density".to_owned(),
        };
        let rows = map_rows(&sample_table(), &columns).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Adachi");
        assert_eq!(rows[1].value, "21,500");
    }

    #[test]
    fn missing_column_names_the_available_headers() {
        let columns = ColumnMapping {
            name: "Name".to_owned(),
            value: "Price".to_owned(),
        };
        let err = map_rows(&sample_table(), &columns).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Price"));
        assert!(message.contains("Density"));
    }

    #[test]
    fn delimiter_byte_accepts_single_characters() {
        assert_eq!(delimiter_byte(",").unwrap(), b',');
        assert_eq!(delimiter_byte("\t").unwrap(), b'\t');
        assert!(delimiter_byte("||").is_err());
    }
}
