#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generic table scraping for public data sources.
//!
//! Provides the [`Scraper`] trait and concrete implementations for the two
//! formats city studies pull from: HTML tables ([`html_table`]) and CSV
//! files ([`csv_table`]).
//!
//! This crate is a pure scraping library with no awareness of study
//! definitions. It fetches and normalises raw rows into [`serde_json::Value`]
//! objects keyed by column header that callers can map however they like.

pub mod csv_table;
pub mod html_table;

use std::collections::BTreeMap;

/// Errors that can occur during scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Parsing the response body failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A fully scraped table.
#[derive(Debug, Clone)]
pub struct ScrapedTable {
    /// The column headers, in document order.
    pub headers: Vec<String>,
    /// One object per row, keyed by the column headers.
    pub records: Vec<serde_json::Value>,
}

/// Trait for fetching a structured table from a data source.
///
/// Implementations handle a specific strategy (HTML table parsing, CSV
/// reading) and return normalised rows as [`serde_json::Value`] objects.
pub trait Scraper: Send + Sync {
    /// Fetches the table.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if fetching or parsing fails.
    fn fetch(&self) -> impl std::future::Future<Output = Result<ScrapedTable, ScrapeError>> + Send;

    /// Returns the name of the scraping strategy (e.g. `"html_table"`,
    /// `"csv_table"`).
    fn strategy(&self) -> &str;
}

/// Builds a [`reqwest::Client`] with the given default headers.
pub(crate) fn build_client(
    headers: &BTreeMap<String, String>,
) -> Result<reqwest::Client, ScrapeError> {
    let mut header_map = reqwest::header::HeaderMap::new();
    for (key, value) in headers {
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ScrapeError::Parse(format!("invalid header name '{key}': {e}")))?;
        let val = reqwest::header::HeaderValue::from_str(value)
            .map_err(|e| ScrapeError::Parse(format!("invalid header value '{value}': {e}")))?;
        header_map.insert(name, val);
    }
    reqwest::Client::builder()
        .default_headers(header_map)
        .build()
        .map_err(ScrapeError::Http)
}
