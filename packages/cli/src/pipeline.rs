//! Staged pipeline orchestrator for the venue map toolchain.
//!
//! Chains score -> assemble -> discover -> profile -> cluster -> report,
//! each stage taking parameters and returning values; nothing is shared
//! through globals. Uses `indicatif` progress bars for the two stages
//! that spend real time on the network (geocoding and venue discovery).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use dialoguer::{Confirm, Input, Select};
use venue_map_cli_utils::{IndicatifProgress, MultiProgress};
use venue_map_cluster::elbow::{ElbowPoint, elbow_scan};
use venue_map_discovery::Credentials;
use venue_map_discovery::explore::fetch_for_neighborhoods;
use venue_map_discovery_models::NeighborhoodLookup;
use venue_map_geocoder::nominatim::geocode_neighborhoods;
use venue_map_neighborhood::assemble_neighborhoods;
use venue_map_neighborhood_models::{
    Neighborhood, NeighborhoodCoordRow, NeighborhoodIdRow, NeighborhoodPriceRow,
};
use venue_map_profile::{CoverageStatus, VenueProfile};
use venue_map_report::boundaries::check_boundaries;
use venue_map_report::export::{ReportMetadata, write_csv, write_json};
use venue_map_report::{build_report, render_table};
use venue_map_source::study_def::StudyDefinition;
use venue_map_source::tables::fetch_table;
use venue_map_source::{ErrorPolicy, parsing::normalize_name, registry};
use venue_map_ward::{assemble_wards, score_wards};
use venue_map_ward_models::ScoredWard;

/// Where the CSV/JSON reports land unless `--output-dir` says otherwise.
pub const DEFAULT_OUTPUT_DIR: &str = "data/reports";

/// Boundary feature property the name check reads unless overridden.
pub const DEFAULT_BOUNDARY_PROPERTY: &str = "name";

/// Arguments for the elbow scan flow.
#[derive(Default)]
pub struct ElbowArgs {
    /// Ward to drill into; prompted from the shortlist when `None`.
    pub ward: Option<String>,
    /// Venue search radius override, in metres.
    pub radius: Option<u32>,
    /// Per-neighborhood venue limit override.
    pub limit: Option<u32>,
    /// Highest k the scan tries; study default when `None`.
    pub max_k: Option<usize>,
    /// Clustering seed override.
    pub seed: Option<u64>,
    /// Per-record failure policy.
    pub on_error: ErrorPolicy,
}

/// Arguments for the full pipeline run.
pub struct RunArgs {
    /// Ward to drill into; prompted from the shortlist when `None`.
    pub ward: Option<String>,
    /// Venue search radius override, in metres.
    pub radius: Option<u32>,
    /// Per-neighborhood venue limit override.
    pub limit: Option<u32>,
    /// Cluster count; study default when `None`.
    pub k: Option<usize>,
    /// Highest k the elbow scan tries; study default when `None`.
    pub max_k: Option<usize>,
    /// Clustering seed override.
    pub seed: Option<u64>,
    /// Ward shortlist length override.
    pub top_n: Option<usize>,
    /// Comma-separated competitor categories; study default when `None`.
    pub competitors: Option<String>,
    /// Per-record failure policy.
    pub on_error: ErrorPolicy,
    /// Directory the CSV/JSON reports are written to.
    pub output_dir: PathBuf,
    /// Optional `GeoJSON` boundary file to check report names against.
    pub boundaries: Option<PathBuf>,
    /// Feature property holding the neighborhood name.
    pub boundary_property: String,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            ward: None,
            radius: None,
            limit: None,
            k: None,
            max_k: None,
            seed: None,
            top_n: None,
            competitors: None,
            on_error: ErrorPolicy::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            boundaries: None,
            boundary_property: DEFAULT_BOUNDARY_PROPERTY.to_string(),
        }
    }
}

/// Resolves the study to operate on.
///
/// An explicit `--study-file` path wins over a registry `--study` id; with
/// neither, a registry holding exactly one study selects it implicitly.
/// The resolved study is validated before it is returned.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the id is
/// unknown, no study can be inferred, or validation fails.
pub fn resolve_study(
    id: Option<&str>,
    file: Option<&Path>,
) -> Result<StudyDefinition, Box<dyn std::error::Error>> {
    let study = if let Some(path) = file {
        let raw = std::fs::read_to_string(path)?;
        venue_map_source::study_def::parse_study_toml(&raw)?
    } else if let Some(id) = id {
        registry::find_study(id)
            .ok_or_else(|| format!("Unknown study: {id} (available: {})", available_ids()))?
    } else {
        let mut studies = registry::all_studies();
        if studies.len() == 1 {
            studies.remove(0)
        } else {
            return Err(format!("Specify --study (available: {})", available_ids()).into());
        }
    };

    study.validate()?;
    Ok(study)
}

/// Formats the registry's study ids for error messages.
fn available_ids() -> String {
    let studies = registry::all_studies();
    let ids: Vec<&str> = studies.iter().map(|study| study.id.as_str()).collect();
    ids.join(", ")
}

/// Prompts for a study when running interactively.
///
/// Skips the prompt when only one study is configured.
///
/// # Errors
///
/// Returns an error if the terminal prompt fails or validation rejects
/// the chosen study.
pub fn prompt_study() -> Result<StudyDefinition, Box<dyn std::error::Error>> {
    let mut studies = registry::all_studies();

    let study = if studies.len() == 1 {
        studies.remove(0)
    } else {
        let labels: Vec<String> = studies
            .iter()
            .map(|study| format!("{} \u{2014} {}", study.id, study.name))
            .collect();

        let idx = Select::new()
            .with_prompt("Which study?")
            .items(&labels)
            .default(0)
            .interact()?;

        studies.swap_remove(idx)
    };

    log::info!("Using study '{}' ({})", study.id, study.name);
    study.validate()?;
    Ok(study)
}

/// Fetches both ward tables, joins them, and scores the shortlist.
///
/// # Errors
///
/// Returns an error if a table fetch fails or assembly/scoring rejects
/// the data under the given policy.
pub async fn ward_shortlist(
    study: &StudyDefinition,
    top_n: usize,
    policy: ErrorPolicy,
) -> Result<Vec<ScoredWard>, Box<dyn std::error::Error>> {
    log::info!("Scoring wards for {}...", study.city);

    let density_rows = fetch_table(&study.wards.density).await?;
    let price_rows = fetch_table(&study.wards.price).await?;

    let wards = assemble_wards(
        &density_rows,
        &price_rows,
        &study.wards.price_suffixes,
        policy,
    )?;
    log::info!("Assembled {} ward(s)", wards.len());

    Ok(score_wards(&wards, top_n)?)
}

/// Prints the scored ward shortlist as a fixed-width table.
pub fn print_ward_table(scored: &[ScoredWard]) {
    println!();
    println!("{:<6} {:<20} {:<14} {:<14} RATIO", "RANK", "WARD", "DENSITY", "PRICE");
    println!("{}", "-".repeat(64));
    for (index, entry) in scored.iter().enumerate() {
        println!(
            "{:<6} {:<20} {:<14.0} {:<14.0} {:.4}",
            index + 1,
            entry.ward.name,
            entry.ward.density,
            entry.ward.price,
            entry.ratio
        );
    }
    println!();
}

/// Runs the elbow scan flow: resolve a ward, profile its neighborhoods,
/// and print the WCSS-per-k table.
///
/// # Errors
///
/// Returns an error if any stage fails or no neighborhood has venue data
/// to cluster.
pub async fn elbow(
    mut study: StudyDefinition,
    args: ElbowArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(radius) = args.radius {
        study.discovery.radius_m = radius;
    }
    if let Some(limit) = args.limit {
        study.discovery.limit = limit;
    }
    let max_k = args.max_k.unwrap_or(study.analysis.max_k);
    let seed = args.seed.unwrap_or(study.analysis.seed);

    // Resolve credentials up front so a missing variable fails before any
    // geocoder quota is spent.
    let credentials = Credentials::from_env()?;

    let ward = match args.ward {
        Some(ward) => ward,
        None => {
            let scored = ward_shortlist(&study, study.analysis.top_wards, args.on_error).await?;
            print_ward_table(&scored);
            select_ward(&scored)?
        }
    };

    let (_, venue_profile) =
        profile_stage(&study, &ward, args.on_error, &credentials, multi).await?;

    let clusterable = venue_profile.clusterable();
    if clusterable.is_empty() {
        return Err("no neighborhood has venue data to cluster".into());
    }

    log::info!("Scanning k = 1..={max_k} (seed {seed})...");
    let points = elbow_scan(&clusterable, max_k, seed)?;
    print_elbow_table(&points);

    Ok(())
}

/// Runs the full pipeline for one study, from ward scoring through
/// report export.
///
/// # Errors
///
/// Returns an error if any stage fails under the configured policy.
#[allow(clippy::too_many_lines)]
pub async fn run(
    mut study: StudyDefinition,
    args: RunArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline_start = Instant::now();

    if let Some(radius) = args.radius {
        study.discovery.radius_m = radius;
    }
    if let Some(limit) = args.limit {
        study.discovery.limit = limit;
    }
    let top_n = args.top_n.unwrap_or(study.analysis.top_wards);
    let max_k = args.max_k.unwrap_or(study.analysis.max_k);
    let seed = args.seed.unwrap_or(study.analysis.seed);
    let competitor_set = args.competitors.as_deref().map_or_else(
        || study.analysis.competitor_categories.clone(),
        parse_competitors,
    );

    // Resolve credentials up front so a missing variable fails before any
    // geocoder quota is spent.
    let credentials = Credentials::from_env()?;

    log::info!("Running study '{}' ({})", study.id, study.name);

    let scored = ward_shortlist(&study, top_n, args.on_error).await?;
    print_ward_table(&scored);

    let ward = match args.ward {
        Some(ward) => ward,
        None => select_ward(&scored)?,
    };
    log::info!("Drilling into {ward}");

    let (neighborhoods, venue_profile) =
        profile_stage(&study, &ward, args.on_error, &credentials, multi).await?;

    let clusterable = venue_profile.clusterable();
    if clusterable.is_empty() {
        return Err("no neighborhood has venue data to cluster".into());
    }

    log::info!("Scanning k = 1..={max_k} (seed {seed})...");
    let points = elbow_scan(&clusterable, max_k, seed)?;
    print_elbow_table(&points);

    let mut k = args.k.unwrap_or(study.analysis.k);
    if k > clusterable.len() {
        log::warn!(
            "k = {k} exceeds the {} clusterable neighborhood(s); clamping",
            clusterable.len()
        );
        k = clusterable.len();
    }

    log::info!("Clustering at k = {k} (seed {seed})...");
    let assignments = venue_map_cluster::assign(&venue_profile, k, seed, study.analysis.top_categories)?;

    let rows = build_report(&neighborhoods, &venue_profile, &assignments, &competitor_set);
    println!("{}", render_table(&rows));

    std::fs::create_dir_all(&args.output_dir)?;
    let metadata = ReportMetadata {
        study: study.id.clone(),
        ward: ward.clone(),
        generated_at: Utc::now(),
        radius_m: study.discovery.radius_m,
        k,
        seed,
    };
    let csv_path = args.output_dir.join(format!("{}_report.csv", study.id));
    let json_path = args.output_dir.join(format!("{}_report.json", study.id));
    write_csv(&csv_path, &rows)?;
    write_json(&json_path, &rows, &metadata)?;

    if let Some(boundaries) = &args.boundaries {
        let check = check_boundaries(&rows, boundaries, &args.boundary_property)?;
        log::info!(
            "Boundary check: {} matched, {} missing from boundaries, {} unmatched feature(s)",
            check.matched.len(),
            check.missing_in_boundaries.len(),
            check.unmatched_features.len()
        );
    }

    let elapsed = pipeline_start.elapsed();
    log::info!("Pipeline complete in {:.1}s", elapsed.as_secs_f64());

    Ok(())
}

/// Prompts for optional overrides, then runs the full pipeline.
///
/// # Errors
///
/// Returns an error if a prompt fails or the pipeline run fails.
pub async fn interactive_run(
    study: StudyDefinition,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut args = RunArgs::default();

    let advanced = Confirm::new()
        .with_prompt("Configure advanced options?")
        .default(false)
        .interact()?;

    if advanced {
        args.k = prompt_optional(&format!("Cluster count k (default {})", study.analysis.k))?;
        args.seed = prompt_optional(&format!("Random seed (default {})", study.analysis.seed))?;
        args.radius = prompt_optional(&format!(
            "Venue search radius in metres (default {})",
            study.discovery.radius_m
        ))?;

        let competitors: String = Input::new()
            .with_prompt("Competitor categories (comma-separated)")
            .default(study.analysis.competitor_categories.join(","))
            .interact_text()?;
        args.competitors = Some(competitors);

        let skip = Confirm::new()
            .with_prompt("Skip bad records instead of aborting?")
            .default(false)
            .interact()?;
        args.on_error = if skip {
            ErrorPolicy::Skip
        } else {
            ErrorPolicy::Abort
        };

        let output: String = Input::new()
            .with_prompt("Output directory")
            .default(DEFAULT_OUTPUT_DIR.to_string())
            .interact_text()?;
        args.output_dir = PathBuf::from(output);
    }

    run(study, args, multi).await
}

/// Prompts the user to pick the ward to drill into.
fn select_ward(scored: &[ScoredWard]) -> Result<String, Box<dyn std::error::Error>> {
    if scored.is_empty() {
        return Err("no wards to choose from".into());
    }

    let labels: Vec<String> = scored
        .iter()
        .map(|entry| format!("{} \u{2014} ratio {:.4}", entry.ward.name, entry.ratio))
        .collect();

    let idx = Select::new()
        .with_prompt("Ward to drill into")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(scored[idx].ward.name.clone())
}

/// Assembles the chosen ward's neighborhoods: fetches the id and price
/// tables, geocodes every district, and merges the three tables.
async fn assemble_stage(
    study: &StudyDefinition,
    ward: &str,
    policy: ErrorPolicy,
    multi: &MultiProgress,
) -> Result<Vec<Neighborhood>, Box<dyn std::error::Error>> {
    log::info!("Assembling neighborhoods for {ward}...");

    let id_rows = fetch_table(&study.neighborhoods.ids).await?;
    let price_rows = fetch_table(&study.neighborhoods.prices).await?;

    // Check the positional pairing before spending geocoder quota; a
    // mismatch here can only get worse downstream.
    if id_rows.len() != price_rows.len() {
        return Err(format!(
            "neighborhood tables disagree: {} id row(s) vs {} price row(s)",
            id_rows.len(),
            price_rows.len()
        )
        .into());
    }

    let ids: Vec<NeighborhoodIdRow> = id_rows
        .into_iter()
        .map(|row| NeighborhoodIdRow {
            name: row.name,
            postal_code: row.value,
        })
        .collect();
    let prices: Vec<NeighborhoodPriceRow> = price_rows
        .into_iter()
        .map(|row| NeighborhoodPriceRow {
            name: row.name,
            price: row.value,
        })
        .collect();
    let names: Vec<String> = ids.iter().map(|row| row.name.clone()).collect();

    let bar = IndicatifProgress::batch_bar(multi, "Geocoding neighborhoods");
    let coords = geocode_neighborhoods(
        &study.geocoder,
        &study.country_codes,
        &study.city,
        ward,
        &names,
        policy,
        Some(bar),
    )
    .await?;

    let (ids, prices) = filter_to_geocoded(ids, prices, &coords);

    Ok(assemble_neighborhoods(
        &ids,
        &prices,
        &coords,
        &study.neighborhoods.price_suffixes,
        policy,
    )?)
}

/// Drops id/price rows whose neighborhood the geocoder skipped, keeping
/// the two tables positionally paired with the coordinate rows.
fn filter_to_geocoded(
    ids: Vec<NeighborhoodIdRow>,
    prices: Vec<NeighborhoodPriceRow>,
    coords: &[NeighborhoodCoordRow],
) -> (Vec<NeighborhoodIdRow>, Vec<NeighborhoodPriceRow>) {
    let geocoded: BTreeSet<String> = coords
        .iter()
        .map(|row| normalize_name(&row.name))
        .collect();

    let mut kept_ids = Vec::with_capacity(coords.len());
    let mut kept_prices = Vec::with_capacity(coords.len());
    for (id, price) in ids.into_iter().zip(prices) {
        if geocoded.contains(&normalize_name(&id.name)) {
            kept_ids.push(id);
            kept_prices.push(price);
        }
    }

    (kept_ids, kept_prices)
}

/// Runs assembly, venue discovery, and profiling for one ward.
async fn profile_stage(
    study: &StudyDefinition,
    ward: &str,
    policy: ErrorPolicy,
    credentials: &Credentials,
    multi: &MultiProgress,
) -> Result<(Vec<Neighborhood>, VenueProfile), Box<dyn std::error::Error>> {
    let neighborhoods = assemble_stage(study, ward, policy, multi).await?;
    if neighborhoods.is_empty() {
        return Err(format!("no neighborhoods could be assembled for {ward}").into());
    }

    log::info!(
        "Discovering venues around {} neighborhood(s)...",
        neighborhoods.len()
    );
    let bar = IndicatifProgress::batch_bar(multi, "Fetching venues");
    let lookups: BTreeMap<String, NeighborhoodLookup> =
        fetch_for_neighborhoods(&study.discovery, credentials, &neighborhoods, Some(bar)).await?;

    let venue_profile = venue_map_profile::profile(&neighborhoods, &lookups);

    let mut profiled = 0usize;
    let mut no_venues = 0usize;
    let mut failed = 0usize;
    for status in venue_profile.statuses().values() {
        match status {
            CoverageStatus::Profiled => profiled += 1,
            CoverageStatus::NoVenues => no_venues += 1,
            CoverageStatus::LookupFailed => failed += 1,
        }
    }
    log::info!("Coverage: {profiled} profiled, {no_venues} without venues, {failed} failed lookup(s)");

    Ok((neighborhoods, venue_profile))
}

/// Prints the WCSS-per-k elbow table.
fn print_elbow_table(points: &[ElbowPoint]) {
    println!();
    println!("{:<6} WCSS", "K");
    println!("{}", "-".repeat(24));
    for point in points {
        println!("{:<6} {:.6}", point.k, point.wcss);
    }
    println!();
}

/// Splits a comma-separated category list, dropping empty entries.
fn parse_competitors(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Prompts for an optional value, returning `None` on empty input.
fn prompt_optional<T: std::str::FromStr>(
    prompt: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T::Err: std::fmt::Display,
{
    let input: String = Input::new()
        .with_prompt(format!("{prompt} (empty for default)"))
        .allow_empty(true)
        .interact_text()?;

    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        trimmed
            .parse()
            .map(Some)
            .map_err(|error| format!("invalid value '{trimmed}': {error}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_row(name: &str) -> NeighborhoodIdRow {
        NeighborhoodIdRow {
            name: name.to_owned(),
            postal_code: "116-0000".to_owned(),
        }
    }

    fn price_row(name: &str) -> NeighborhoodPriceRow {
        NeighborhoodPriceRow {
            name: name.to_owned(),
            price: "300,000".to_owned(),
        }
    }

    fn coord_row(name: &str) -> NeighborhoodCoordRow {
        NeighborhoodCoordRow {
            name: name.to_owned(),
            latitude: 35.73,
            longitude: 139.78,
        }
    }

    #[test]
    fn drops_rows_the_geocoder_skipped_in_pairs() {
        let ids = vec![id_row("Machiya"), id_row("Ogu"), id_row("Minami-Senju")];
        let prices = vec![
            price_row("machiya"),
            price_row("OGU"),
            price_row("minami-senju"),
        ];
        let coords = vec![coord_row("Machiya"), coord_row("Minami-Senju")];

        let (kept_ids, kept_prices) = filter_to_geocoded(ids, prices, &coords);

        assert_eq!(kept_ids.len(), 2);
        assert_eq!(kept_prices.len(), 2);
        assert_eq!(kept_ids[0].name, "Machiya");
        assert_eq!(kept_prices[0].name, "machiya");
        assert_eq!(kept_ids[1].name, "Minami-Senju");
        assert_eq!(kept_prices[1].name, "minami-senju");
    }

    #[test]
    fn keeps_everything_when_all_names_geocoded() {
        let ids = vec![id_row("Machiya"), id_row("Ogu")];
        let prices = vec![price_row("Machiya"), price_row("Ogu")];
        let coords = vec![coord_row(" machiya "), coord_row("OGU")];

        let (kept_ids, kept_prices) = filter_to_geocoded(ids, prices, &coords);

        assert_eq!(kept_ids.len(), 2);
        assert_eq!(kept_prices.len(), 2);
    }

    #[test]
    fn splits_competitor_lists() {
        assert_eq!(
            parse_competitors("Bakery, Cafe ,,Dessert Shop"),
            vec!["Bakery", "Cafe", "Dessert Shop"]
        );
        assert!(parse_competitors("  ").is_empty());
    }
}
