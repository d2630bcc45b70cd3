//! Marine heatwave tracker.
//!
//! Reads a JSON dataset, detects and tracks features in one field and prints
//! the run summary as JSON on stdout.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mhw_common::Dataset;
use mhw_detect::{TrackSummary, Tracker, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "mhw-tracker")]
#[command(about = "Detect and track marine heatwaves in a gridded anomaly field")]
struct Args {
    /// Dataset file (JSON)
    #[arg(short, long, env = "MHW_INPUT")]
    input: String,

    /// Name of the anomaly field to track
    #[arg(short, long, default_value = "ssta")]
    field: String,

    /// Tracker configuration file (YAML); defaults come from the environment
    #[arg(short, long, env = "MHW_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing on stderr so stdout carries only the summary
    let level = parse_level(&args.log_level);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!(input = %args.input, field = %args.field, "Starting marine heatwave tracker");

    let config = load_config(args.config.as_deref())?;
    info!(
        radius = config.radius,
        min_size_percentile = config.min_size_percentile,
        connectivity_3d = %config.connectivity_3d,
        wrap_longitude = config.wrap_longitude,
        track_across_meridian = config.track_across_meridian,
        "Loaded configuration"
    );

    let dataset = load_dataset(&args.input)?;
    let tracker = Tracker::new(config).context("invalid tracker configuration")?;
    let result = tracker
        .run(&dataset, &args.field)
        .with_context(|| format!("tracking field '{}' failed", args.field))?;

    info!(
        features = result.summary.total_features,
        percent_area_kept = result.summary.percent_area_kept,
        "Tracking complete"
    );

    println!("{}", render_summary(&result.summary)?);
    Ok(())
}

fn render_summary(summary: &TrackSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize summary")
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn load_config(path: Option<&str>) -> Result<TrackerConfig> {
    match path {
        Some(path) => TrackerConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config from {}", path)),
        None => Ok(TrackerConfig::from_env()),
    }
}

fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let dataset: Dataset = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse dataset {}", path.display()))?;
    dataset
        .validate()
        .with_context(|| format!("invalid dataset {}", path.display()))?;
    Ok(dataset)
}
