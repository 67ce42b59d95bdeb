#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood row and record types.
//!
//! A neighborhood is assembled from three independently sourced tables:
//! an id table (name + postal code), a land-price table, and a geocoded
//! coordinate table. The row types here mirror those tables; the
//! assembled [`Neighborhood`] is the joined record used by the profiling
//! and clustering stages.

use serde::{Deserialize, Serialize};

/// One row of the neighborhood id table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodIdRow {
    /// Neighborhood name as published by the source.
    pub name: String,
    /// Postal code for the neighborhood.
    pub postal_code: String,
}

/// One row of the neighborhood land-price table.
///
/// The price is kept as the raw cell string; unit suffixes and thousands
/// separators are stripped during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodPriceRow {
    /// Neighborhood name as published by the source.
    pub name: String,
    /// Raw price cell (e.g., `"305,000円/m²"`).
    pub price: String,
}

/// One geocoded neighborhood coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodCoordRow {
    /// Neighborhood name the lookup was issued for.
    pub name: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// A fully assembled neighborhood record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    /// Neighborhood name from the id table.
    pub name: String,
    /// Postal code from the id table.
    pub postal_code: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Land price in the study's base unit (e.g., JPY per square meter).
    pub price: f64,
}
