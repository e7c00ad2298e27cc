#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for fetching and filtering building footprints.

use std::path::{Path, PathBuf};
use std::time::Instant;

use building_map_building_models::{BoundingWindow, BuildingsPayload};
use building_map_buildings::service::{BuildingService, JoinMode};
use building_map_source::registry::load_config;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "building_map", about = "Building footprint fetch and filter tool")]
struct Cli {
    /// Dataset configuration file (overrides `BUILDING_MAP_CONFIG` env var)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch buildings inside a window and print the payload as JSON.
    /// Bounds that are not given are taken from the configured default
    /// window.
    Fetch {
        /// Northern latitude boundary
        #[arg(long, allow_negative_numbers = true)]
        north: Option<f64>,
        /// Southern latitude boundary
        #[arg(long, allow_negative_numbers = true)]
        south: Option<f64>,
        /// Eastern longitude boundary
        #[arg(long, allow_negative_numbers = true)]
        east: Option<f64>,
        /// Western longitude boundary
        #[arg(long, allow_negative_numbers = true)]
        west: Option<f64>,
        /// Maximum number of footprints to fetch
        #[arg(long)]
        limit: Option<u32>,
        /// Skip the zoning and assessment joins
        #[arg(long)]
        no_joins: bool,
    },
    /// Apply a filter list to a saved payload and print the matching ids
    Filter {
        /// Payload JSON as printed by `fetch`
        #[arg(long)]
        payload: PathBuf,
        /// JSON list of `{attribute, operator, value}` filters
        #[arg(long)]
        filters: PathBuf,
    },
    /// List the configured datasets
    Datasets,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = &result {
        log::error!("{e}");
    }
    result
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Fetch {
            north,
            south,
            east,
            west,
            limit,
            no_joins,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let default = config.default_window;
            let window = BoundingWindow::new(
                north.unwrap_or(default.north),
                south.unwrap_or(default.south),
                east.unwrap_or(default.east),
                west.unwrap_or(default.west),
            )?;
            let mode = if no_joins {
                JoinMode::Disabled
            } else {
                JoinMode::Enabled
            };

            let service = BuildingService::from_config(config)?;
            let start = Instant::now();
            let payload = service.fetch_buildings(window, limit, mode).await?;
            log::info!(
                "Fetched {} buildings within {window} in {:.1}s",
                payload.count,
                start.elapsed().as_secs_f64()
            );

            println!("{}", serde_json::to_string_pretty(payload.as_ref())?);
        }
        Commands::Filter { payload, filters } => {
            let payload: BuildingsPayload = serde_json::from_str(&read(&payload)?)?;
            let filters: serde_json::Value = serde_json::from_str(&read(&filters)?)?;
            let predicates = building_map_filter::parse_filters(&filters)?;

            let result = building_map_filter::apply_predicates(&payload.buildings, &predicates);
            log::info!(
                "{} of {} buildings matched",
                result.count,
                payload.buildings.len()
            );

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Datasets => {
            let config = load_config(cli.config.as_deref())?;
            println!("{:<12} {:<12} LIMIT", "ROLE", "ID");
            println!("{}", "-".repeat(32));
            println!(
                "{:<12} {:<12} {}",
                "buildings", config.buildings.id, config.buildings.limit
            );
            println!(
                "{:<12} {:<12} {}",
                "zoning", config.zoning.dataset.id, config.zoning.dataset.limit
            );
            println!(
                "{:<12} {:<12} {}",
                "assessment", config.assessment.dataset.id, config.assessment.dataset.limit
            );
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
}
