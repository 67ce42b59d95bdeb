//! Advisory check that report names match a boundary file's features.
//!
//! Map overlays join on the neighborhood name; a name that has no
//! boundary feature silently disappears from the map. This check
//! surfaces that mismatch ahead of time. It only compares names, it
//! does not try to fix them.

use std::collections::BTreeSet;
use std::path::Path;

use geojson::GeoJson;
use venue_map_source::parsing::normalize_name;

use crate::{ReportError, ScoredNeighborhood};

/// Outcome of the advisory name check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryCheck {
    /// Report neighborhoods with a matching boundary feature.
    pub matched: Vec<String>,
    /// Report neighborhoods with no boundary feature.
    pub missing_in_boundaries: Vec<String>,
    /// Boundary features no report row claims.
    pub unmatched_features: Vec<String>,
}

/// Loads a `GeoJSON` `FeatureCollection` and compares each feature's
/// `name_property` against the report's neighborhood names.
///
/// Matching is by [`normalize_name`] on both sides. Every mismatch is
/// logged as a warning and returned in the summary.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be read, is not valid
/// `GeoJSON`, or is not a `FeatureCollection`.
pub fn check_boundaries(
    rows: &[ScoredNeighborhood],
    path: &Path,
    name_property: &str,
) -> Result<BoundaryCheck, ReportError> {
    let raw = std::fs::read_to_string(path)?;
    let geojson = raw.parse::<GeoJson>()?;
    check_feature_names(rows, &geojson, name_property)
}

/// Runs the name comparison against an already parsed `GeoJSON` value.
fn check_feature_names(
    rows: &[ScoredNeighborhood],
    geojson: &GeoJson,
    name_property: &str,
) -> Result<BoundaryCheck, ReportError> {
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(ReportError::Boundary {
            message: "expected a FeatureCollection".to_string(),
        });
    };

    let mut feature_names: Vec<String> = Vec::new();
    for feature in &collection.features {
        let name = feature
            .properties
            .as_ref()
            .and_then(|properties| properties.get(name_property))
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty());

        match name {
            Some(name) => feature_names.push(name.to_string()),
            None => log::debug!("Boundary feature without a '{name_property}' property"),
        }
    }
    feature_names.sort();
    feature_names.dedup();

    let feature_keys: BTreeSet<String> = feature_names
        .iter()
        .map(|name| normalize_name(name))
        .collect();
    let row_keys: BTreeSet<String> = rows
        .iter()
        .map(|row| normalize_name(&row.name))
        .collect();

    let mut matched = Vec::new();
    let mut missing_in_boundaries = Vec::new();
    for row in rows {
        if feature_keys.contains(&normalize_name(&row.name)) {
            matched.push(row.name.clone());
        } else {
            log::warn!(
                "No boundary feature named '{}'; map overlays will skip it",
                row.name
            );
            missing_in_boundaries.push(row.name.clone());
        }
    }

    let mut unmatched_features = Vec::new();
    for name in feature_names {
        if !row_keys.contains(&normalize_name(&name)) {
            log::warn!("Boundary feature '{name}' matches no reported neighborhood");
            unmatched_features.push(name);
        }
    }

    Ok(BoundaryCheck {
        matched,
        missing_in_boundaries,
        unmatched_features,
    })
}

#[cfg(test)]
mod tests {
    use venue_map_profile::CoverageStatus;

    use super::*;

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "name": "Machiya" }, "geometry": null },
            { "type": "Feature", "properties": { "name": "Minami-Senju" }, "geometry": null },
            { "type": "Feature", "properties": { "code": 7 }, "geometry": null }
        ]
    }"#;

    fn row(name: &str) -> ScoredNeighborhood {
        ScoredNeighborhood {
            name: name.to_string(),
            postal_code: "116-0000".to_string(),
            latitude: 35.74,
            longitude: 139.78,
            price: 300_000.0,
            cluster: None,
            top_categories: vec![],
            competitor_count: Some(0),
            status: CoverageStatus::NoVenues,
        }
    }

    #[test]
    fn reports_matches_and_both_directions_of_mismatch() {
        let geojson = BOUNDARIES.parse::<GeoJson>().unwrap();
        let rows = vec![row("machiya"), row("Ogu")];

        let check = check_feature_names(&rows, &geojson, "name").unwrap();
        assert_eq!(check.matched, vec!["machiya"]);
        assert_eq!(check.missing_in_boundaries, vec!["Ogu"]);
        assert_eq!(check.unmatched_features, vec!["Minami-Senju"]);
    }

    #[test]
    fn non_collection_geojson_is_rejected() {
        let geojson = r#"{ "type": "Point", "coordinates": [139.77, 35.74] }"#
            .parse::<GeoJson>()
            .unwrap();

        let result = check_feature_names(&[], &geojson, "name");
        assert!(matches!(result, Err(ReportError::Boundary { .. })));
    }
}
