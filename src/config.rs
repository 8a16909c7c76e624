//! Configuration management for WSI Tiler.
//!
//! This module provides the command-line interface:
//! - `crop`: extract tiles from every slide under one or more folders
//! - `inspect`: list discovered slides and their pyramid levels
//!
//! Every option can also be set through an environment variable with the
//! `WSI_TILER_` prefix.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use wsi_tiler::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Crop(config) => println!("writing to {}", config.destination.display()),
//!     Command::Inspect(config) => println!("{} folders", config.folders.len()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `WSI_TILER_METHOD` - `grid` or `random` (default: random)
//! - `WSI_TILER_FOLDERS` - Comma-separated source folders
//! - `WSI_TILER_DESTINATION` - Output folder
//! - `WSI_TILER_SIZE` - Tile width and height, comma-separated (default: 256,256)
//! - `WSI_TILER_OVERLAP` - Grid overlap ratio (default: 0.0)
//! - `WSI_TILER_NUMBER` - Random tile count (default: 10000)
//! - `WSI_TILER_LEVEL` - Pyramid level (default: 2)
//! - `WSI_TILER_EXTENSION` - Slide file extension (default: svs)
//! - `WSI_TILER_SEED` - Random seed
//! - `WSI_TILER_MAX_ATTEMPTS` - Random attempt budget (default: 1000 per tile)
//! - `WSI_TILER_FORMAT` - `png` or `jpeg` (default: png)
//! - `WSI_TILER_JPEG_QUALITY` - JPEG quality (default: 90)
//! - `WSI_TILER_TILE_CACHE` - Decoded source tiles cached per slide (default: 64)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::generator::{CropOptions, Method, DEFAULT_COUNT, DEFAULT_LEVEL};
use crate::slide::DEFAULT_TILE_CACHE_CAPACITY;
use crate::tile::{is_valid_quality, OutputFormat, DEFAULT_JPEG_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default slide file extension.
pub const DEFAULT_EXTENSION: &str = "svs";

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Tiler - Extract tissue tiles from Whole Slide Images.
///
/// Reads pyramidal slides (Aperio SVS, pyramidal TIFF), keeps tiles that
/// contain tissue and writes them as individual images for dataset building.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract tiles from every slide under the given folders.
    Crop(CropConfig),

    /// List discovered slides and their pyramid levels.
    Inspect(InspectConfig),
}

// =============================================================================
// Crop Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CropConfig {
    // =========================================================================
    // Sources
    // =========================================================================
    /// Folders searched recursively for slides.
    #[arg(long, num_args = 1.., required = true, value_delimiter = ',', env = "WSI_TILER_FOLDERS")]
    pub folders: Vec<PathBuf>,

    /// Slide file extension, matched case-insensitively.
    #[arg(long, default_value = DEFAULT_EXTENSION, env = "WSI_TILER_EXTENSION")]
    pub extension: String,

    /// Decoded source tiles cached per slide.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "WSI_TILER_TILE_CACHE")]
    pub tile_cache: usize,

    // =========================================================================
    // Sampling
    // =========================================================================
    /// Tile position strategy.
    #[arg(long, value_enum, default_value_t = Method::Random, env = "WSI_TILER_METHOD")]
    pub method: Method,

    /// Tile width and height in pixels.
    #[arg(
        long,
        num_args = 2,
        value_names = ["WIDTH", "HEIGHT"],
        default_values_t = [256u32, 256u32],
        value_delimiter = ',',
        env = "WSI_TILER_SIZE"
    )]
    pub size: Vec<u32>,

    /// Pyramid level to read (0 = full resolution).
    #[arg(long, default_value_t = DEFAULT_LEVEL, env = "WSI_TILER_LEVEL")]
    pub level: usize,

    /// Grid mode: fraction of a tile shared with its neighbour, in [0, 1).
    #[arg(long, default_value_t = 0.0, env = "WSI_TILER_OVERLAP")]
    pub overlap: f64,

    /// Random mode: number of useful tiles to write.
    #[arg(long, default_value_t = DEFAULT_COUNT, env = "WSI_TILER_NUMBER")]
    pub number: u64,

    /// Random mode: seed for reproducible sampling.
    #[arg(long, env = "WSI_TILER_SEED")]
    pub seed: Option<u64>,

    /// Random mode: give up after this many candidate tiles.
    ///
    /// Defaults to 1000 attempts per requested tile.
    #[arg(long, env = "WSI_TILER_MAX_ATTEMPTS")]
    pub max_attempts: Option<u64>,

    // =========================================================================
    // Output
    // =========================================================================
    /// Output folder, created if missing.
    #[arg(long, env = "WSI_TILER_DESTINATION")]
    pub destination: PathBuf,

    /// Image format of written tiles.
    #[arg(long, value_enum, default_value_t = OutputFormat::Png, env = "WSI_TILER_FORMAT")]
    pub format: OutputFormat,

    /// JPEG quality (1-100), used with `--format jpeg`.
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSI_TILER_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Print the run report as JSON on stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CropConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.folders.is_empty() {
            return Err("At least one source folder is required. Set --folders".to_string());
        }

        if self.size.len() != 2 {
            return Err("size takes exactly two values: WIDTH HEIGHT".to_string());
        }
        if self.size.contains(&0) {
            return Err("size values must be greater than 0".to_string());
        }

        if !(0.0..1.0).contains(&self.overlap) {
            return Err("overlap must be in [0, 1)".to_string());
        }

        if self.method == Method::Random && self.number == 0 {
            return Err("number must be greater than 0".to_string());
        }

        if self.max_attempts == Some(0) {
            return Err("max_attempts must be greater than 0".to_string());
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.tile_cache == 0 {
            return Err("tile_cache must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Tile size as `(width, height)`, or `None` unless exactly two values were given.
    pub fn tile_size(&self) -> Option<(u32, u32)> {
        match self.size.as_slice() {
            [width, height] => Some((*width, *height)),
            _ => None,
        }
    }

    /// Validate the parsed arguments and build run options from them.
    pub fn to_options(&self) -> Result<CropOptions, String> {
        self.validate()?;
        let tile_size = self
            .tile_size()
            .ok_or_else(|| "size takes exactly two values: WIDTH HEIGHT".to_string())?;

        Ok(CropOptions {
            method: self.method,
            level: self.level,
            tile_size,
            overlap: self.overlap,
            count: self.number,
            destination: self.destination.clone(),
            seed: self.seed,
            max_attempts: self.max_attempts,
            format: self.format,
            jpeg_quality: self.jpeg_quality,
            tile_cache: self.tile_cache,
        })
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Folders searched recursively for slides.
    #[arg(long, num_args = 1.., required = true, value_delimiter = ',', env = "WSI_TILER_FOLDERS")]
    pub folders: Vec<PathBuf>,

    /// Slide file extension, matched case-insensitively.
    #[arg(long, default_value = DEFAULT_EXTENSION, env = "WSI_TILER_EXTENSION")]
    pub extension: String,

    /// Print slide information as JSON on stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
