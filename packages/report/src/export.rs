//! CSV and JSON export for report rows.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ReportError, ScoredNeighborhood};

/// Run parameters recorded alongside the exported rows, so a report
/// file is reproducible on its own.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Study id the run was built from.
    pub study: String,
    /// Ward the neighborhoods belong to.
    pub ward: String,
    /// When the report was generated (UTC).
    pub generated_at: DateTime<Utc>,
    /// Venue search radius in metres.
    pub radius_m: u32,
    /// Cluster count used for the final k-means run.
    pub k: usize,
    /// Random seed used for clustering.
    pub seed: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a ReportMetadata,
    neighborhoods: &'a [ScoredNeighborhood],
}

/// Writes report rows as CSV with a header row.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be written.
pub fn write_csv(path: &Path, rows: &[ScoredNeighborhood]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "name",
        "postal_code",
        "latitude",
        "longitude",
        "price",
        "cluster",
        "competitor_count",
        "status",
        "top_categories",
    ])?;

    for row in rows {
        writer.write_record(&[
            row.name.clone(),
            row.postal_code.clone(),
            row.latitude.to_string(),
            row.longitude.to_string(),
            row.price.to_string(),
            row.cluster
                .map_or_else(String::new, |label| label.to_string()),
            row.competitor_count
                .map_or_else(String::new, |count| count.to_string()),
            row.status.to_string(),
            row.top_categories.join(", "),
        ])?;
    }

    writer.flush()?;
    log::info!("Wrote {} report rows to {}", rows.len(), path.display());
    Ok(())
}

/// Writes report rows and run metadata as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be written.
pub fn write_json(
    path: &Path,
    rows: &[ScoredNeighborhood],
    metadata: &ReportMetadata,
) -> Result<(), ReportError> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(
        file,
        &JsonReport {
            metadata,
            neighborhoods: rows,
        },
    )?;
    log::info!("Wrote {} report rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use venue_map_profile::CoverageStatus;

    use super::*;

    fn rows() -> Vec<ScoredNeighborhood> {
        vec![
            ScoredNeighborhood {
                name: "Machiya".to_string(),
                postal_code: "116-0001".to_string(),
                latitude: 35.742,
                longitude: 139.779,
                price: 305_000.0,
                cluster: Some(0),
                top_categories: vec!["Bakery".to_string(), "Cafe".to_string()],
                competitor_count: Some(2),
                status: CoverageStatus::Profiled,
            },
            ScoredNeighborhood {
                name: "Yanaka".to_string(),
                postal_code: "116-0002".to_string(),
                latitude: 35.727,
                longitude: 139.766,
                price: 350_000.0,
                cluster: None,
                top_categories: vec![],
                competitor_count: None,
                status: CoverageStatus::LookupFailed,
            },
        ]
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            study: "tokyo_arakawa".to_string(),
            ward: "Arakawa".to_string(),
            generated_at: Utc::now(),
            radius_m: 500,
            k: 5,
            seed: 0,
        }
    }

    #[test]
    fn csv_round_trips_headers_and_placeholders() {
        let dir = std::env::temp_dir().join("venue_map_report_test_csv");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.csv");

        write_csv(&path, &rows()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert!(written.starts_with("name,postal_code,"));
        assert!(written.contains("Machiya"));
        assert!(written.contains("lookup_failed"));
        // Unknown counts stay empty, not zero.
        assert!(written.contains("Yanaka,116-0002,35.727,139.766,350000,,,lookup_failed,"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn json_nests_metadata_and_rows() {
        let dir = std::env::temp_dir().join("venue_map_report_test_json");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");

        write_json(&path, &rows(), &metadata()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();

        assert_eq!(value["metadata"]["study"], "tokyo_arakawa");
        assert_eq!(value["metadata"]["k"], 5);
        assert_eq!(value["neighborhoods"].as_array().unwrap().len(), 2);
        assert_eq!(value["neighborhoods"][0]["status"], "profiled");
        assert!(value["neighborhoods"][1]["competitor_count"].is_null());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
