#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for venue-map neighborhoods.
//!
//! Resolves neighborhood names to latitude/longitude coordinates via the
//! Nominatim / OpenStreetMap search API. The public instance enforces a
//! strict rate limit of **1 request per second**, so batch geocoding runs
//! sequentially with a configurable pause between lookups (`rate_limit_ms`
//! in the study TOML).
//!
//! Every lookup is bounded: a neighborhood that returns no result (or only
//! transient errors) after `max_attempts` tries fails with
//! [`GeocodeError::Exhausted`] instead of looping forever.

pub mod nominatim;

use thiserror::Error;

/// A geocoding result with coordinates and the canonical place name.
#[derive(Debug, Clone)]
pub struct GeocodedPlace {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The display name returned by the geocoder, when present.
    pub display_name: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// A query produced no usable result within the attempt budget.
    #[error("no geocoding result for '{query}' after {attempts} attempts")]
    Exhausted {
        /// The free-form query that failed to resolve.
        query: String,
        /// How many attempts were made before giving up.
        attempts: u32,
    },
}
