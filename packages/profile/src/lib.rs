#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-neighborhood venue category profiling.
//!
//! Turns raw venue lookups into frequency vectors over a shared category
//! universe. Every vector emitted here has the same dimension order (the
//! universe, sorted ascending), which is the invariant the clusterer
//! later re-validates. Neighborhoods with no venues or a failed lookup
//! are flagged with a [`CoverageStatus`] instead of being silently
//! dropped; a failed lookup is insufficient data, never "zero
//! competitors".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use venue_map_discovery_models::{NeighborhoodLookup, Venue, VenueObservation};
use venue_map_neighborhood_models::Neighborhood;

/// The ordered, deduplicated union of all venue categories seen across
/// all neighborhoods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryUniverse {
    categories: Vec<String>,
}

impl CategoryUniverse {
    /// Builds a universe from an arbitrary category iterator, sorting
    /// ascending and removing duplicates.
    #[must_use]
    pub fn from_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut categories: Vec<String> = categories.into_iter().collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    /// The categories in vector dimension order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the universe has no categories at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Dimension index of a category, if present.
    #[must_use]
    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|candidate| candidate.as_str().cmp(category))
            .ok()
    }
}

/// A neighborhood's category frequency vector, aligned to the universe.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyVector {
    /// One relative frequency per universe category, summing to 1.0 for
    /// profiled neighborhoods and all zero otherwise.
    pub values: Vec<f64>,
}

impl FrequencyVector {
    /// An all-zero vector of the given dimension.
    #[must_use]
    pub fn zero(dimension: usize) -> Self {
        Self {
            values: vec![0.0; dimension],
        }
    }
}

/// How much venue signal a neighborhood actually has.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// The lookup succeeded and found at least one venue.
    Profiled,
    /// The lookup succeeded but the area has no venues.
    NoVenues,
    /// The lookup failed; nothing is known about the area.
    LookupFailed,
}

/// The profiling result for a whole study area.
#[derive(Debug, Clone)]
pub struct VenueProfile {
    universe: CategoryUniverse,
    vectors: BTreeMap<String, FrequencyVector>,
    statuses: BTreeMap<String, CoverageStatus>,
    observations: Vec<VenueObservation>,
}

impl VenueProfile {
    /// The shared category universe.
    #[must_use]
    pub fn universe(&self) -> &CategoryUniverse {
        &self.universe
    }

    /// All frequency vectors, keyed by neighborhood name.
    #[must_use]
    pub fn vectors(&self) -> &BTreeMap<String, FrequencyVector> {
        &self.vectors
    }

    /// Coverage statuses, keyed by neighborhood name.
    #[must_use]
    pub fn statuses(&self) -> &BTreeMap<String, CoverageStatus> {
        &self.statuses
    }

    /// Coverage status for one neighborhood.
    #[must_use]
    pub fn status(&self, neighborhood: &str) -> Option<CoverageStatus> {
        self.statuses.get(neighborhood).copied()
    }

    /// The raw observation list backing the vectors.
    #[must_use]
    pub fn observations(&self) -> &[VenueObservation] {
        &self.observations
    }

    /// The sub-map of vectors with [`CoverageStatus::Profiled`].
    ///
    /// This is what enters clustering; flagged neighborhoods stay out of
    /// k-means but remain in the report.
    #[must_use]
    pub fn clusterable(&self) -> BTreeMap<String, FrequencyVector> {
        self.vectors
            .iter()
            .filter(|(name, _)| self.status(name) == Some(CoverageStatus::Profiled))
            .map(|(name, vector)| (name.clone(), vector.clone()))
            .collect()
    }
}

/// Profiles every neighborhood's venue lookup into a frequency vector.
///
/// Frequencies are per-category counts divided by the neighborhood's
/// observation count, so each profiled vector sums to 1.0. Neighborhoods
/// without venues, with a failed lookup, or missing from `lookups`
/// entirely get an all-zero vector and a non-`Profiled` status.
#[must_use]
pub fn profile(
    neighborhoods: &[Neighborhood],
    lookups: &BTreeMap<String, NeighborhoodLookup>,
) -> VenueProfile {
    let universe = CategoryUniverse::from_categories(
        lookups
            .values()
            .filter_map(|lookup| match lookup {
                NeighborhoodLookup::Fetched(venues) => Some(venues),
                NeighborhoodLookup::Failed { .. } => None,
            })
            .flatten()
            .map(|venue| venue.category.clone()),
    );

    let mut vectors = BTreeMap::new();
    let mut statuses = BTreeMap::new();
    let mut observations = Vec::new();

    for neighborhood in neighborhoods {
        let (status, vector) = match lookups.get(&neighborhood.name) {
            Some(NeighborhoodLookup::Fetched(venues)) if !venues.is_empty() => {
                for venue in venues {
                    observations.push(VenueObservation {
                        neighborhood: neighborhood.name.clone(),
                        neighborhood_latitude: neighborhood.latitude,
                        neighborhood_longitude: neighborhood.longitude,
                        venue: venue.clone(),
                    });
                }
                (
                    CoverageStatus::Profiled,
                    frequency_vector(&universe, venues),
                )
            }
            Some(NeighborhoodLookup::Fetched(_)) => (
                CoverageStatus::NoVenues,
                FrequencyVector::zero(universe.len()),
            ),
            Some(NeighborhoodLookup::Failed { message }) => {
                log::debug!("No venue data for '{}': {message}", neighborhood.name);
                (
                    CoverageStatus::LookupFailed,
                    FrequencyVector::zero(universe.len()),
                )
            }
            None => {
                log::debug!("No venue lookup recorded for '{}'", neighborhood.name);
                (
                    CoverageStatus::LookupFailed,
                    FrequencyVector::zero(universe.len()),
                )
            }
        };

        vectors.insert(neighborhood.name.clone(), vector);
        statuses.insert(neighborhood.name.clone(), status);
    }

    VenueProfile {
        universe,
        vectors,
        statuses,
        observations,
    }
}

/// The `k` most frequent categories for one vector.
///
/// Pairs are ordered by frequency descending, category name ascending on
/// ties, so the output is deterministic and idempotent across calls.
/// Returns min(`k`, universe size) pairs.
#[must_use]
pub fn top_k(universe: &CategoryUniverse, vector: &FrequencyVector, k: usize) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = universe
        .categories()
        .iter()
        .zip(&vector.values)
        .map(|(category, &frequency)| (category.clone(), frequency))
        .collect();

    pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.truncate(k);
    pairs
}

/// Counts raw observations for `neighborhood` whose category is in the
/// competitor set. Exact string match.
#[must_use]
pub fn competitor_count(
    observations: &[VenueObservation],
    neighborhood: &str,
    competitor_set: &[String],
) -> usize {
    observations
        .iter()
        .filter(|observation| {
            observation.neighborhood == neighborhood
                && competitor_set.contains(&observation.venue.category)
        })
        .count()
}

/// Builds one frequency vector aligned to the universe.
fn frequency_vector(universe: &CategoryUniverse, venues: &[Venue]) -> FrequencyVector {
    let mut counts = vec![0_usize; universe.len()];
    for venue in venues {
        if let Some(index) = universe.index_of(&venue.category) {
            counts[index] += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)] // venue counts are small
    let values = counts
        .iter()
        .map(|&count| count as f64 / venues.len() as f64)
        .collect();

    FrequencyVector { values }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(name: &str, category: &str) -> Venue {
        Venue {
            name: name.to_string(),
            latitude: 35.74,
            longitude: 139.78,
            category: category.to_string(),
        }
    }

    fn neighborhood(name: &str) -> Neighborhood {
        Neighborhood {
            name: name.to_string(),
            postal_code: "116-0000".to_string(),
            latitude: 35.74,
            longitude: 139.78,
            price: 300_000.0,
        }
    }

    fn fetched(venues: Vec<Venue>) -> NeighborhoodLookup {
        NeighborhoodLookup::Fetched(venues)
    }

    fn bakery_cafe_profile() -> VenueProfile {
        let neighborhoods = vec![neighborhood("A")];
        let mut lookups = BTreeMap::new();
        lookups.insert(
            "A".to_string(),
            fetched(vec![
                venue("Pan Ya", "Bakery"),
                venue("Mugi", "Bakery"),
                venue("Kissa 1", "Cafe"),
                venue("Kissa 2", "Cafe"),
                venue("Kissa 3", "Cafe"),
            ]),
        );
        profile(&neighborhoods, &lookups)
    }

    #[test]
    fn frequencies_sum_to_one_for_profiled_neighborhoods() {
        let result = bakery_cafe_profile();
        let vector = &result.vectors()["A"];
        let sum: f64 = vector.values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(result.status("A"), Some(CoverageStatus::Profiled));
    }

    #[test]
    fn bakery_and_cafe_split_two_fifths_three_fifths() {
        let result = bakery_cafe_profile();
        let universe = result.universe();
        let vector = &result.vectors()["A"];

        let bakery = universe.index_of("Bakery").unwrap();
        let cafe = universe.index_of("Cafe").unwrap();
        assert!((vector.values[bakery] - 0.4).abs() < 1e-9);
        assert!((vector.values[cafe] - 0.6).abs() < 1e-9);

        let count =
            competitor_count(result.observations(), "A", &["Bakery".to_string()]);
        assert_eq!(count, 2);
    }

    #[test]
    fn zero_observations_are_flagged_not_dropped() {
        let neighborhoods = vec![neighborhood("A"), neighborhood("B")];
        let mut lookups = BTreeMap::new();
        lookups.insert("A".to_string(), fetched(vec![venue("Pan Ya", "Bakery")]));
        lookups.insert("B".to_string(), fetched(vec![]));

        let result = profile(&neighborhoods, &lookups);
        assert_eq!(result.status("B"), Some(CoverageStatus::NoVenues));
        assert!(result.vectors()["B"].values.iter().all(|&value| value == 0.0));
        assert_eq!(result.vectors().len(), 2);
    }

    #[test]
    fn failed_lookup_is_insufficient_data_never_zero_competitors() {
        let neighborhoods = vec![neighborhood("A"), neighborhood("B")];
        let mut lookups = BTreeMap::new();
        lookups.insert("A".to_string(), fetched(vec![venue("Pan Ya", "Bakery")]));
        lookups.insert(
            "B".to_string(),
            NeighborhoodLookup::Failed {
                message: "timed out".to_string(),
            },
        );

        let result = profile(&neighborhoods, &lookups);
        assert_eq!(result.status("B"), Some(CoverageStatus::LookupFailed));

        let clusterable = result.clusterable();
        assert!(clusterable.contains_key("A"));
        assert!(!clusterable.contains_key("B"));
    }

    #[test]
    fn universe_is_sorted_and_deduplicated() {
        let neighborhoods = vec![neighborhood("A"), neighborhood("B")];
        let mut lookups = BTreeMap::new();
        lookups.insert("A".to_string(), fetched(vec![venue("1", "Ramen"), venue("2", "Bakery")]));
        lookups.insert("B".to_string(), fetched(vec![venue("3", "Bakery"), venue("4", "Cafe")]));

        let result = profile(&neighborhoods, &lookups);
        assert_eq!(result.universe().categories(), ["Bakery", "Cafe", "Ramen"]);
    }

    #[test]
    fn top_k_is_deterministic_with_ascending_tie_break() {
        let universe = CategoryUniverse::from_categories(
            ["Udon", "Bakery", "Cafe", "Ramen", "Sushi", "Tempura"]
                .into_iter()
                .map(String::from),
        );
        let vector = FrequencyVector {
            // Aligned to: Bakery, Cafe, Ramen, Sushi, Tempura, Udon
            values: vec![0.3, 0.1, 0.2, 0.1, 0.1, 0.2],
        };

        let first = top_k(&universe, &vector, 5);
        let second = top_k(&universe, &vector, 5);
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);

        let names: Vec<&str> = first.iter().map(|(category, _)| category.as_str()).collect();
        assert_eq!(names, vec!["Bakery", "Ramen", "Udon", "Cafe", "Sushi"]);
    }

    #[test]
    fn top_k_caps_at_universe_size() {
        let universe =
            CategoryUniverse::from_categories(["Bakery", "Cafe"].into_iter().map(String::from));
        let vector = FrequencyVector {
            values: vec![0.5, 0.5],
        };
        assert_eq!(top_k(&universe, &vector, 10).len(), 2);
    }
}
