#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Study definitions and shared fetch/parse plumbing.
//!
//! A [`study_def::StudyDefinition`] captures everything unique about one
//! city study in a serializable TOML config: where the ward and neighborhood
//! tables live, which columns to read, and the geocoder/discovery endpoints
//! to query. The [`registry`] embeds the bundled studies at compile time.
//!
//! The rest of the crate is plumbing every fetch path shares: bounded HTTP
//! [`retry`] helpers, cell [`parsing`] utilities, typed [`tables`] access,
//! and the [`progress`] reporting trait.

pub mod parsing;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod study_def;
pub mod tables;

use strum_macros::{AsRefStr, Display, EnumString};

/// Errors that can occur while loading study data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Table scraping failed.
    #[error("Scrape error: {0}")]
    Scrape(#[from] venue_map_scraper::ScrapeError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML study definition failed to deserialize.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A fetch gave up after exhausting its retries or hit a permanent
    /// HTTP status.
    #[error("Fetch error: {message}")]
    Fetch {
        /// Description of what went wrong.
        message: String,
    },

    /// A cell or column could not be interpreted.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong, naming the offending value.
        message: String,
    },

    /// A study definition or caller-supplied parameter is invalid.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the violated precondition.
        message: String,
    },
}

/// How per-record failures are handled during fetching and assembly.
///
/// The default is [`ErrorPolicy::Abort`]: every failure surfaces as an
/// error. [`ErrorPolicy::Skip`] drops the offending record and continues,
/// always leaving a `log::warn!` trail.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorPolicy {
    /// Fail the whole operation on the first bad record.
    #[default]
    Abort,
    /// Log the bad record and continue without it.
    Skip,
}

/// User agent sent with every outbound request. Nominatim's usage policy
/// requires one that identifies the application.
pub const USER_AGENT: &str = "venue-map/0.1 (https://github.com/BSteffaniak/venue-map)";

/// Request timeout for study data fetches.
const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Builds the shared HTTP client used by fetch paths.
///
/// # Errors
///
/// Returns [`reqwest::Error`] if the TLS backend fails to initialize.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
}
