#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the venue map toolchain.
//!
//! Provides subcommands for the batch site-selection pipeline: `wards`
//! scores the ward shortlist, `elbow` profiles one ward's neighborhoods
//! and prints the WCSS-per-k table, and `run` executes the whole pipeline
//! through clustering, reporting, and export. Without a subcommand the
//! tool drops into an interactive menu.
//!
//! Uses `indicatif-log-bridge` (via [`venue_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::Select;
use venue_map_cli_utils::MultiProgress;
use venue_map_source::ErrorPolicy;

#[derive(Parser)]
#[command(name = "venue-map", about = "Venue-based site selection toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the ward tables and print the density/price shortlist
    Wards {
        /// Study id from the bundled registry (e.g., "`tokyo_arakawa`")
        #[arg(long)]
        study: Option<String>,
        /// Path to a study TOML file (overrides --study)
        #[arg(long)]
        study_file: Option<PathBuf>,
        /// How many top-ranked wards to print
        #[arg(long)]
        top_n: Option<usize>,
        /// What to do with records that fail to parse: abort or skip
        #[arg(long, default_value = "abort")]
        on_error: ErrorPolicy,
    },
    /// Profile one ward's neighborhoods and print the WCSS-per-k table
    Elbow {
        /// Study id from the bundled registry (e.g., "`tokyo_arakawa`")
        #[arg(long)]
        study: Option<String>,
        /// Path to a study TOML file (overrides --study)
        #[arg(long)]
        study_file: Option<PathBuf>,
        /// Ward to drill into (prompted from the scored shortlist if omitted)
        #[arg(long)]
        ward: Option<String>,
        /// Venue search radius in metres
        #[arg(long)]
        radius: Option<u32>,
        /// Maximum venues fetched per neighborhood
        #[arg(long)]
        limit: Option<u32>,
        /// Highest cluster count the elbow scan tries
        #[arg(long)]
        max_k: Option<usize>,
        /// Seed for deterministic clustering
        #[arg(long)]
        seed: Option<u64>,
        /// What to do with records that fail to parse: abort or skip
        #[arg(long, default_value = "abort")]
        on_error: ErrorPolicy,
    },
    /// Run the full pipeline: score, assemble, discover, cluster, report
    Run {
        /// Study id from the bundled registry (e.g., "`tokyo_arakawa`")
        #[arg(long)]
        study: Option<String>,
        /// Path to a study TOML file (overrides --study)
        #[arg(long)]
        study_file: Option<PathBuf>,
        /// Ward to drill into (prompted from the scored shortlist if omitted)
        #[arg(long)]
        ward: Option<String>,
        /// Venue search radius in metres
        #[arg(long)]
        radius: Option<u32>,
        /// Maximum venues fetched per neighborhood
        #[arg(long)]
        limit: Option<u32>,
        /// Cluster count for the final k-means run
        #[arg(long)]
        k: Option<usize>,
        /// Highest cluster count the elbow scan tries
        #[arg(long)]
        max_k: Option<usize>,
        /// Seed for deterministic clustering
        #[arg(long)]
        seed: Option<u64>,
        /// How many top-ranked wards to print
        #[arg(long)]
        top_n: Option<usize>,
        /// Comma-separated venue categories counted as competitors
        /// (overrides the study's list)
        #[arg(long)]
        competitors: Option<String>,
        /// What to do with records that fail to parse: abort or skip
        #[arg(long, default_value = "abort")]
        on_error: ErrorPolicy,
        /// Directory the CSV/JSON reports are written to
        #[arg(long, default_value = pipeline::DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
        /// GeoJSON boundary file to check report names against
        #[arg(long)]
        boundaries: Option<PathBuf>,
        /// Feature property holding the neighborhood name in the boundary
        /// file
        #[arg(long, default_value = pipeline::DEFAULT_BOUNDARY_PROPERTY)]
        boundary_property: String,
    },
}

/// Top-level tool selection for the interactive menu.
enum Tool {
    RunPipeline,
    ScoreWards,
    ElbowScan,
}

impl Tool {
    const ALL: &[Self] = &[Self::RunPipeline, Self::ScoreWards, Self::ElbowScan];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunPipeline => "Run full pipeline",
            Self::ScoreWards => "Score wards",
            Self::ElbowScan => "Elbow scan",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = venue_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive(&multi).await;
    };

    match command {
        Commands::Wards {
            study,
            study_file,
            top_n,
            on_error,
        } => {
            let study = pipeline::resolve_study(study.as_deref(), study_file.as_deref())?;
            let top_n = top_n.unwrap_or(study.analysis.top_wards);
            let scored = pipeline::ward_shortlist(&study, top_n, on_error).await?;
            pipeline::print_ward_table(&scored);
        }
        Commands::Elbow {
            study,
            study_file,
            ward,
            radius,
            limit,
            max_k,
            seed,
            on_error,
        } => {
            let study = pipeline::resolve_study(study.as_deref(), study_file.as_deref())?;
            let args = pipeline::ElbowArgs {
                ward,
                radius,
                limit,
                max_k,
                seed,
                on_error,
            };
            pipeline::elbow(study, args, &multi).await?;
        }
        Commands::Run {
            study,
            study_file,
            ward,
            radius,
            limit,
            k,
            max_k,
            seed,
            top_n,
            competitors,
            on_error,
            output_dir,
            boundaries,
            boundary_property,
        } => {
            let study = pipeline::resolve_study(study.as_deref(), study_file.as_deref())?;
            let args = pipeline::RunArgs {
                ward,
                radius,
                limit,
                k,
                max_k,
                seed,
                top_n,
                competitors,
                on_error,
                output_dir,
                boundaries,
                boundary_property,
            };
            pipeline::run(study, args, &multi).await?;
        }
    }

    Ok(())
}

/// Runs the interactive menu shown when no subcommand is given.
async fn interactive(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Venue Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let study = pipeline::prompt_study()?;

    match Tool::ALL[idx] {
        Tool::RunPipeline => pipeline::interactive_run(study, multi).await?,
        Tool::ScoreWards => {
            let top_n = study.analysis.top_wards;
            let scored = pipeline::ward_shortlist(&study, top_n, ErrorPolicy::default()).await?;
            pipeline::print_ward_table(&scored);
        }
        Tool::ElbowScan => {
            pipeline::elbow(study, pipeline::ElbowArgs::default(), multi).await?;
        }
    }

    Ok(())
}
