#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ward record types.

use serde::{Deserialize, Serialize};

/// A ward with its population density and average land price.
///
/// Immutable once assembled; ranking produces new [`ScoredWard`] values
/// instead of mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ward {
    /// Ward name as published by the density source.
    pub name: String,
    /// Population density (people per square kilometer).
    pub density: f64,
    /// Average land price in the study's base unit.
    pub price: f64,
}

/// A ward ranked by its density/price ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredWard {
    /// The underlying ward record.
    pub ward: Ward,
    /// Density divided by price; higher means denser demand per unit of
    /// land cost.
    pub ratio: f64,
}
