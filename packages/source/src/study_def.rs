//! Config-driven city study definition.
//!
//! [`StudyDefinition`] captures everything unique about one site-selection
//! study in a serializable config struct: where the ward and neighborhood
//! tables live, how their columns map onto names and values, and which
//! geocoder/discovery endpoints to query. A single generic pipeline handles
//! every study, eliminating per-city code.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::SourceError;

// ── Top-level study definition ───────────────────────────────────────────

/// A complete, config-driven study definition.
///
/// Loaded from TOML files at compile time (see [`crate::registry`]) or from
/// a caller-supplied path.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyDefinition {
    /// Unique identifier (e.g., `"tokyo_arakawa"`).
    pub id: String,
    /// Human-readable name (e.g., `"Tokyo / Arakawa bakery study"`).
    pub name: String,
    /// City the ward tables cover.
    pub city: String,
    /// Comma-separated ISO country codes passed to the geocoder
    /// (e.g., `"jp"`).
    pub country_codes: String,
    /// Ward-level data sources.
    pub wards: WardSources,
    /// Neighborhood-level data sources for the drill-down ward.
    pub neighborhoods: NeighborhoodSources,
    /// Forward-geocoding endpoint settings.
    pub geocoder: GeocoderConfig,
    /// Venue-discovery endpoint settings.
    pub discovery: DiscoveryConfig,
    /// Default analysis parameters (all overridable from the CLI).
    #[serde(default)]
    pub analysis: AnalysisDefaults,
}

/// Where the two ward-level tables come from.
#[derive(Debug, Clone, Deserialize)]
pub struct WardSources {
    /// Population density table (defines the ward universe).
    pub density: TableConfig,
    /// Average land price table.
    pub price: TableConfig,
    /// Currency/unit suffixes stripped from price cells.
    #[serde(default)]
    pub price_suffixes: Vec<String>,
}

/// Where the neighborhood tables for the chosen ward come from.
#[derive(Debug, Clone, Deserialize)]
pub struct NeighborhoodSources {
    /// {name, postal code} table.
    pub ids: TableConfig,
    /// {name, price} table.
    pub prices: TableConfig,
    /// Currency/unit suffixes stripped from price cells.
    #[serde(default)]
    pub price_suffixes: Vec<String>,
}

/// One two-column table: how to fetch it and which columns to read.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// How to fetch the raw table.
    pub fetcher: TableFetcherConfig,
    /// Which columns carry the name and the value.
    pub columns: ColumnMapping,
}

/// Maps table column headers onto the `{name, value}` row shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    /// Header of the column holding the place name.
    pub name: String,
    /// Header of the column holding the value (density, price, postal
    /// code, ...).
    pub value: String,
}

/// How to fetch a raw table.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableFetcherConfig {
    /// Scrape an HTML `<table>` from a web page.
    HtmlTable {
        /// URL of the page containing the table.
        url: String,
        /// CSS selector for the target table element.
        table_selector: Option<String>,
        /// CSS selector for header cells.
        header_selector: Option<String>,
        /// CSS selector for body rows.
        row_selector: Option<String>,
        /// CSS selector for cells within a row.
        cell_selector: Option<String>,
        /// Whether `<th>` row-label cells inside body rows count as cells.
        #[serde(default)]
        row_headers: bool,
        /// Whether `[1]`-style footnote references are stripped.
        #[serde(default = "default_strip_footnotes")]
        strip_footnotes: bool,
        /// Additional HTTP headers.
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Read a CSV file from the local filesystem.
    CsvFile {
        /// Path to the CSV file.
        path: String,
        /// Field delimiter (default: comma).
        delimiter: Option<String>,
    },
    /// Download a CSV file.
    CsvUrl {
        /// URL of the CSV file.
        url: String,
        /// Field delimiter (default: comma).
        delimiter: Option<String>,
        /// Additional HTTP headers.
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

const fn default_strip_footnotes() -> bool {
    true
}

// ── Remote endpoints ─────────────────────────────────────────────────────

/// Forward-geocoding endpoint settings (Nominatim-style).
#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    /// Base URL of the geocoding service.
    pub base_url: String,
    /// Milliseconds to wait between consecutive lookups.
    #[serde(default = "default_geocoder_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Bounded lookup attempts per neighborhood before giving up.
    #[serde(default = "default_geocoder_max_attempts")]
    pub max_attempts: u32,
}

const fn default_geocoder_rate_limit_ms() -> u64 {
    1000
}

const fn default_geocoder_max_attempts() -> u32 {
    3
}

/// Venue-discovery endpoint settings (explore-style API).
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Base URL of the discovery API.
    pub base_url: String,
    /// API version date parameter (`v=YYYYMMDD`).
    pub api_version: String,
    /// Search radius around each neighborhood centre, in metres.
    #[serde(default = "default_discovery_radius_m")]
    pub radius_m: u32,
    /// Maximum venues returned per neighborhood.
    #[serde(default = "default_discovery_limit")]
    pub limit: u32,
    /// Milliseconds to wait between consecutive lookups.
    #[serde(default = "default_discovery_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Bounded lookup attempts per neighborhood before giving up.
    #[serde(default = "default_discovery_max_attempts")]
    pub max_attempts: u32,
}

const fn default_discovery_radius_m() -> u32 {
    500
}

const fn default_discovery_max_attempts() -> u32 {
    3
}

const fn default_discovery_limit() -> u32 {
    200
}

const fn default_discovery_rate_limit_ms() -> u64 {
    200
}

// ── Analysis defaults ────────────────────────────────────────────────────

/// Default analysis parameters for a study.
///
/// Every field is a starting point, not a rule: the CLI flags override all
/// of them, and `k` in particular stays a human decision informed by the
/// elbow table.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisDefaults {
    /// How many top-ranked wards to display.
    #[serde(default = "default_top_wards")]
    pub top_wards: usize,
    /// Default cluster count.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Highest k the elbow scan tries.
    #[serde(default = "default_max_k")]
    pub max_k: usize,
    /// Seed for deterministic k-means initialization.
    #[serde(default)]
    pub seed: u64,
    /// How many top categories to keep per cluster assignment.
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
    /// Venue categories counted as competitors.
    #[serde(default)]
    pub competitor_categories: Vec<String>,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            top_wards: default_top_wards(),
            k: default_k(),
            max_k: default_max_k(),
            seed: 0,
            top_categories: default_top_categories(),
            competitor_categories: Vec::new(),
        }
    }
}

const fn default_top_wards() -> usize {
    10
}

const fn default_k() -> usize {
    5
}

const fn default_max_k() -> usize {
    10
}

const fn default_top_categories() -> usize {
    5
}

// ── Parsing and validation ───────────────────────────────────────────────

impl StudyDefinition {
    /// Checks the cross-field invariants a parsed study must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidInput`] naming the first violated
    /// constraint.
    pub fn validate(&self) -> Result<(), SourceError> {
        let invalid = |message: String| Err(SourceError::InvalidInput { message });

        if self.id.trim().is_empty() {
            return invalid("study id must not be empty".to_owned());
        }
        if self.name.trim().is_empty() {
            return invalid(format!("study '{}': name must not be empty", self.id));
        }
        if self.city.trim().is_empty() {
            return invalid(format!("study '{}': city must not be empty", self.id));
        }
        if self.analysis.k == 0 {
            return invalid(format!("study '{}': analysis.k must be >= 1", self.id));
        }
        if self.analysis.max_k < self.analysis.k {
            return invalid(format!(
                "study '{}': analysis.max_k ({}) must be >= analysis.k ({})",
                self.id, self.analysis.max_k, self.analysis.k
            ));
        }
        if self.discovery.radius_m == 0 {
            return invalid(format!("study '{}': discovery.radius_m must be > 0", self.id));
        }
        if self.discovery.limit == 0 {
            return invalid(format!("study '{}': discovery.limit must be > 0", self.id));
        }
        for (label, table) in [
            ("wards.density", &self.wards.density),
            ("wards.price", &self.wards.price),
            ("neighborhoods.ids", &self.neighborhoods.ids),
            ("neighborhoods.prices", &self.neighborhoods.prices),
        ] {
            if table.columns.name.trim().is_empty() || table.columns.value.trim().is_empty() {
                return invalid(format!(
                    "study '{}': {label} column mapping must name both columns",
                    self.id
                ));
            }
        }

        Ok(())
    }
}

/// Parses a [`StudyDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Toml`] if the TOML is malformed or missing
/// required fields.
pub fn parse_study_toml(toml_str: &str) -> Result<StudyDefinition, SourceError> {
    Ok(toml::de::from_str(toml_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_study_toml() -> String {
        r#"
            id = "test_city"
            name = "Test city study"
            city = "Testville"
            country_codes = "jp"

            [wards.density.fetcher]
            type = "html_table"
            url = "https://example.com/wards"
            row_headers = true

            [wards.density.columns]
            name = "Name"
            value = "Density"

            [wards.price.fetcher]
            type = "csv_url"
            url = "https://example.com/prices.csv"

            [wards.price.columns]
            name = "ward"
            value = "price"

            [neighborhoods.ids.fetcher]
            type = "csv_file"
            path = "ids.csv"

            [neighborhoods.ids.columns]
            name = "district"
            value = "postal_code"

            [neighborhoods.prices.fetcher]
            type = "html_table"
            url = "https://example.com/land"

            [neighborhoods.prices.columns]
            name = "district"
            value = "price"

            [geocoder]
            base_url = "https://nominatim.example.com"

            [discovery]
            base_url = "https://api.example.com/v2"
            api_version = "20240101"
        "#
        .to_owned()
    }

    #[test]
    fn parses_minimal_study() {
        let study = parse_study_toml(&minimal_study_toml()).unwrap();

        assert_eq!(study.id, "test_city");
        assert_eq!(study.country_codes, "jp");
        assert!(matches!(
            study.wards.density.fetcher,
            TableFetcherConfig::HtmlTable {
                row_headers: true,
                strip_footnotes: true,
                ..
            }
        ));
        assert!(matches!(
            study.neighborhoods.ids.fetcher,
            TableFetcherConfig::CsvFile { .. }
        ));
        study.validate().unwrap();
    }

    #[test]
    fn analysis_defaults_apply() {
        let study = parse_study_toml(&minimal_study_toml()).unwrap();

        assert_eq!(study.analysis.top_wards, 10);
        assert_eq!(study.analysis.k, 5);
        assert_eq!(study.analysis.max_k, 10);
        assert_eq!(study.analysis.seed, 0);
        assert_eq!(study.geocoder.rate_limit_ms, 1000);
        assert_eq!(study.geocoder.max_attempts, 3);
        assert_eq!(study.discovery.radius_m, 500);
        assert_eq!(study.discovery.limit, 200);
    }

    #[test]
    fn rejects_unknown_fetcher_type() {
        let toml_str = minimal_study_toml().replace("csv_url", "soap_rpc");
        assert!(matches!(
            parse_study_toml(&toml_str),
            Err(SourceError::Toml(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_k_bounds() {
        let toml_str = format!("{}\n[analysis]\nk = 8\nmax_k = 3\n", minimal_study_toml());
        let study = parse_study_toml(&toml_str).unwrap();
        let err = study.validate().unwrap_err();

        assert!(err.to_string().contains("max_k"));
    }
}
