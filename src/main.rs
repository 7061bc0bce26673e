pub mod types;
pub mod config;
pub mod data;
pub mod aggregate;
pub mod classify;
pub mod projection;
pub mod render;
pub mod lookup;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{AppConfig, OutputFormat};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the AQI choropleth map
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// AQI observations CSV
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,
        /// Country boundaries (.geojson, .json or .shp)
        #[arg(long, value_name = "FILE")]
        boundaries: Option<PathBuf>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Show the hover label for the country at a coordinate
    Lookup {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .init();
}

/// Records are fully reduced before the boundary file is opened.
fn load_aggregate(app_config: &AppConfig) -> anyhow::Result<aggregate::Aggregate> {
    let records = data::load_records(&app_config.input)?;
    let aggregate = aggregate::aggregate(
        &records,
        app_config.aggregation.invalid_values,
        &app_config.aggregation.aliases,
    )
    .with_context(|| format!("Failed to aggregate {:?}", app_config.input.data_csv))?;
    if aggregate.is_empty() {
        warn!(
            "No usable AQI rows in {:?}, every country will render as 'No data'",
            app_config.input.data_csv
        );
    }
    Ok(aggregate)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            config,
            data,
            boundaries,
            output,
            format,
        } => {
            let mut app_config = AppConfig::load_or_default(&config)?;
            if let Some(data) = data {
                app_config.input.data_csv = data;
            }
            if let Some(boundaries) = boundaries {
                app_config.input.boundaries = boundaries;
            }
            if let Some(output) = output {
                app_config.output.path = output;
            }
            if let Some(format) = format {
                app_config.output.format = format;
            }
            debug!("Configuration: {:?}", app_config);

            let scale = classify::ThresholdScale::from_config(&app_config.scale)
                .context("Invalid [scale] configuration")?;

            // 1. Aggregate AQI per country
            let aggregate = load_aggregate(&app_config)?;

            // 2. Load boundaries
            let features = data::load_boundaries(&app_config.input)?;

            // 3. Render
            render::write_map(&app_config.output, &aggregate, &scale, &features)?;

            info!("Generation complete");
        }
        Commands::Lookup { config, lon, lat } => {
            let app_config = AppConfig::load_or_default(&config)?;

            let aggregate = load_aggregate(&app_config)?;
            let features = data::load_boundaries(&app_config.input)?;

            debug!("{} countries with data", aggregate.len());
            let locator = lookup::CountryLocator::new(&features);
            match locator.lookup(&aggregate, lon, lat) {
                Some(hit) => println!("{}", hit.tooltip()),
                None => println!("no country at ({}, {})", lon, lat),
            }
        }
    }

    Ok(())
}
