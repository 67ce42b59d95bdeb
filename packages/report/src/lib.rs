#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Final scored-neighborhood report.
//!
//! Joins assembled neighborhoods with their cluster labels, top
//! categories, and competitor counts into one sorted table. The report
//! applies no exclusion rules: price thresholds and judgments about
//! "too many competitors" stay with the reader, not the tool.

pub mod boundaries;
pub mod export;

use serde::Serialize;
use thiserror::Error;
use venue_map_cluster::ClusterAssignment;
use venue_map_neighborhood_models::Neighborhood;
use venue_map_profile::{CoverageStatus, VenueProfile, competitor_count};

/// Errors from report export and boundary checking.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The boundary file could not be parsed as `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),

    /// The boundary file has an unusable shape.
    #[error("boundary file: {message}")]
    Boundary {
        /// Description of what is wrong with the file.
        message: String,
    },
}

/// One row of the final report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNeighborhood {
    /// Neighborhood name.
    pub name: String,
    /// Postal code.
    pub postal_code: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Land price in the study's base unit.
    pub price: f64,
    /// Cluster label, when the neighborhood entered clustering.
    pub cluster: Option<u32>,
    /// Most frequent venue categories, when clustered.
    pub top_categories: Vec<String>,
    /// Competitor venues nearby; `None` when the lookup failed and the
    /// count is unknowable.
    pub competitor_count: Option<usize>,
    /// Venue data coverage for this neighborhood.
    pub status: CoverageStatus,
}

/// Joins neighborhoods, profile, and cluster assignments into report
/// rows sorted by price ascending, name ascending on ties.
///
/// A neighborhood with a failed lookup keeps `competitor_count = None`;
/// an unknown competitor situation is never reported as zero.
#[must_use]
pub fn build_report(
    neighborhoods: &[Neighborhood],
    profile: &VenueProfile,
    assignments: &[ClusterAssignment],
    competitor_set: &[String],
) -> Vec<ScoredNeighborhood> {
    let mut rows: Vec<ScoredNeighborhood> = neighborhoods
        .iter()
        .map(|neighborhood| {
            let status = profile
                .status(&neighborhood.name)
                .unwrap_or(CoverageStatus::LookupFailed);
            let assignment = assignments
                .iter()
                .find(|assignment| assignment.neighborhood == neighborhood.name);

            let competitors = match status {
                CoverageStatus::LookupFailed => None,
                CoverageStatus::Profiled | CoverageStatus::NoVenues => Some(competitor_count(
                    profile.observations(),
                    &neighborhood.name,
                    competitor_set,
                )),
            };

            ScoredNeighborhood {
                name: neighborhood.name.clone(),
                postal_code: neighborhood.postal_code.clone(),
                latitude: neighborhood.latitude,
                longitude: neighborhood.longitude,
                price: neighborhood.price,
                cluster: assignment.map(|assignment| assignment.label),
                top_categories: assignment
                    .map(|assignment| assignment.top_categories.clone())
                    .unwrap_or_default(),
                competitor_count: competitors,
                status,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.price.total_cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Renders report rows as a plain aligned text table.
#[must_use]
pub fn render_table(rows: &[ScoredNeighborhood]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<22} {:<12} {:<8} {:<12} {:<14} TOP CATEGORIES\n",
        "NEIGHBORHOOD", "PRICE", "CLUSTER", "COMPETITORS", "STATUS"
    ));
    out.push_str(&"-".repeat(96));
    out.push('\n');

    for row in rows {
        let cluster = row
            .cluster
            .map_or_else(|| "-".to_string(), |label| label.to_string());
        let competitors = row
            .competitor_count
            .map_or_else(|| "-".to_string(), |count| count.to_string());

        out.push_str(&format!(
            "{:<22} {:<12.0} {:<8} {:<12} {:<14} {}\n",
            truncate(&row.name, 21),
            row.price,
            cluster,
            competitors,
            row.status,
            row.top_categories.join(", "),
        ));
    }

    out
}

/// Truncates to `max_len` characters, ending with an ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let mut result: String = s.chars().take(max_len.saturating_sub(1)).collect();
        result.push('…');
        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use venue_map_discovery_models::{NeighborhoodLookup, Venue};

    use super::*;

    fn neighborhood(name: &str, price: f64) -> Neighborhood {
        Neighborhood {
            name: name.to_string(),
            postal_code: "116-0000".to_string(),
            latitude: 35.74,
            longitude: 139.78,
            price,
        }
    }

    fn venue(category: &str) -> Venue {
        Venue {
            name: format!("{category} venue"),
            latitude: 35.74,
            longitude: 139.78,
            category: category.to_string(),
        }
    }

    fn competitor_set() -> Vec<String> {
        vec!["Bakery".to_string()]
    }

    fn fixture() -> (Vec<Neighborhood>, VenueProfile, Vec<ClusterAssignment>) {
        let neighborhoods = vec![
            neighborhood("Machiya", 305_000.0),
            neighborhood("Arakawa", 298_000.0),
            neighborhood("Ogu", 298_000.0),
            neighborhood("Yanaka", 350_000.0),
        ];

        let mut lookups = BTreeMap::new();
        lookups.insert(
            "Machiya".to_string(),
            NeighborhoodLookup::Fetched(vec![venue("Bakery"), venue("Bakery"), venue("Cafe")]),
        );
        lookups.insert(
            "Arakawa".to_string(),
            NeighborhoodLookup::Fetched(vec![venue("Cafe")]),
        );
        lookups.insert("Ogu".to_string(), NeighborhoodLookup::Fetched(vec![]));
        lookups.insert(
            "Yanaka".to_string(),
            NeighborhoodLookup::Failed {
                message: "timed out".to_string(),
            },
        );

        let profile = venue_map_profile::profile(&neighborhoods, &lookups);
        let assignments = vec![
            ClusterAssignment {
                neighborhood: "Machiya".to_string(),
                label: 0,
                top_categories: vec!["Bakery".to_string(), "Cafe".to_string()],
            },
            ClusterAssignment {
                neighborhood: "Arakawa".to_string(),
                label: 1,
                top_categories: vec!["Cafe".to_string()],
            },
        ];

        (neighborhoods, profile, assignments)
    }

    #[test]
    fn rows_sort_by_price_then_name() {
        let (neighborhoods, profile, assignments) = fixture();
        let rows = build_report(&neighborhoods, &profile, &assignments, &competitor_set());

        let names: Vec<&str> = rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["Arakawa", "Ogu", "Machiya", "Yanaka"]);
    }

    #[test]
    fn failed_lookup_has_no_competitor_count() {
        let (neighborhoods, profile, assignments) = fixture();
        let rows = build_report(&neighborhoods, &profile, &assignments, &competitor_set());

        let yanaka = rows.iter().find(|row| row.name == "Yanaka").unwrap();
        assert_eq!(yanaka.status, CoverageStatus::LookupFailed);
        assert_eq!(yanaka.competitor_count, None);
        assert_eq!(yanaka.cluster, None);

        let ogu = rows.iter().find(|row| row.name == "Ogu").unwrap();
        assert_eq!(ogu.status, CoverageStatus::NoVenues);
        assert_eq!(ogu.competitor_count, Some(0));
    }

    #[test]
    fn competitor_counts_come_from_raw_observations() {
        let (neighborhoods, profile, assignments) = fixture();
        let rows = build_report(&neighborhoods, &profile, &assignments, &competitor_set());

        let machiya = rows.iter().find(|row| row.name == "Machiya").unwrap();
        assert_eq!(machiya.competitor_count, Some(2));
        assert_eq!(machiya.cluster, Some(0));
        assert_eq!(machiya.top_categories, vec!["Bakery", "Cafe"]);
    }

    #[test]
    fn table_renders_every_row_with_placeholders() {
        let (neighborhoods, profile, assignments) = fixture();
        let rows = build_report(&neighborhoods, &profile, &assignments, &competitor_set());
        let table = render_table(&rows);

        assert!(table.contains("NEIGHBORHOOD"));
        assert!(table.contains("Machiya"));
        assert!(table.contains("lookup_failed"));
        assert_eq!(table.lines().count(), 2 + rows.len());
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("Machiya", 21), "Machiya");
        assert_eq!(truncate("南千住七丁目東町会エリア", 5), "南千住七…");
    }
}
