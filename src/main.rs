//! WSI Tiler - Extract tissue tiles from Whole Slide Images.
//!
//! This binary parses the command line, sets up logging and runs the
//! requested command.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_tiler::{
    config::{Cli, Command, CropConfig, InspectConfig},
    generator::{run, Method, RunReport},
    slide::{LevelInfo, Slide, SlideRegistry, TiffOpener},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Crop(config) => run_crop(config),
        Command::Inspect(config) => run_inspect(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_tiler=debug"
    } else {
        "wsi_tiler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Crop Command
// =============================================================================

fn run_crop(config: CropConfig) -> ExitCode {
    init_logging(config.verbose);

    let options = match config.to_options() {
        Ok(options) => options,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Configuration:");
    info!("  Method: {:?}", options.method);
    info!(
        "  Folders: {}",
        config
            .folders
            .iter()
            .map(|f| f.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("  Extension: .{}", config.extension);
    info!("  Tile size: {}x{}", options.tile_size.0, options.tile_size.1);
    info!("  Level: {}", options.level);
    match options.method {
        Method::Grid => info!("  Overlap: {}", options.overlap),
        Method::Random => info!("  Number: {}", options.count),
    }
    info!("  Destination: {}", options.destination.display());

    let report = match run(&config.folders, &config.extension, &options) {
        Ok(report) => report,
        Err(e) => {
            error!("Tiling failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        return print_json(&report);
    }

    print_summary(&report);
    ExitCode::SUCCESS
}

fn print_summary(report: &RunReport) {
    info!(
        "Wrote {} tile(s) from {} slide(s) after {} candidate(s) to {}",
        report.tiles_written,
        report.slides,
        report.attempts,
        report.destination.display()
    );
    for slide in &report.per_slide {
        info!(
            "  {}: {} of {} kept",
            slide.slide, slide.written, slide.candidates
        );
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

/// One discovered slide as printed by `inspect`.
#[derive(Debug, Serialize)]
struct SlideSummary {
    id: String,
    path: PathBuf,
    levels: Vec<LevelInfo>,
}

fn run_inspect(config: InspectConfig) -> ExitCode {
    init_logging(config.verbose);

    let registry = match SlideRegistry::open(&config.folders, &config.extension, &TiffOpener::default())
    {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to open slides: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let summaries: Vec<SlideSummary> = registry
        .iter()
        .map(|(path, slide)| SlideSummary {
            id: slide.id().to_string(),
            path: path.to_path_buf(),
            levels: (0..slide.level_count())
                .filter_map(|level| slide.level_info(level))
                .collect(),
        })
        .collect();

    if config.json {
        return print_json(&summaries);
    }

    if summaries.is_empty() {
        println!("(no slides found)");
        return ExitCode::SUCCESS;
    }

    for summary in &summaries {
        println!("{}  {}", summary.id, summary.path.display());
        for (level, info) in summary.levels.iter().enumerate() {
            println!(
                "  level {}: {}x{} (downsample {:.2})",
                level, info.width, info.height, info.downsample
            );
        }
    }
    println!();
    println!("Total: {} slide(s)", summaries.len());

    ExitCode::SUCCESS
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}
