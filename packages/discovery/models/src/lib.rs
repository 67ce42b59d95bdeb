#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Venue discovery types.

use serde::{Deserialize, Serialize};

/// A venue returned by the discovery API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    /// Venue name.
    pub name: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Primary category name (e.g., `"Bakery"`). The category universe
    /// is open-ended and defined by the API.
    pub category: String,
}

/// One venue observed near a neighborhood centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueObservation {
    /// Neighborhood the lookup was issued for.
    pub neighborhood: String,
    /// Latitude of the neighborhood centre.
    pub neighborhood_latitude: f64,
    /// Longitude of the neighborhood centre.
    pub neighborhood_longitude: f64,
    /// The observed venue.
    pub venue: Venue,
}

/// Outcome of the venue lookup for one neighborhood.
///
/// A failed lookup is recorded rather than dropped so the profiler can
/// distinguish "no venues nearby" from "we never found out".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NeighborhoodLookup {
    /// The lookup succeeded, possibly with zero venues.
    Fetched(Vec<Venue>),
    /// The lookup failed after its attempt budget.
    Failed {
        /// Description of the final failure.
        message: String,
    },
}
