//! Tile generation: the `run` entry point and its two strategies.
//!
//! ```text
//! folders ──▶ SlideRegistry ──▶ grid | random ──▶ classifier ──▶ OutputWriter
//! ```
//!
//! - [`grid`]: every cell of a regular grid per slide, deterministic
//! - [`rejection`]: uniformly random positions across the slide pool until
//!   a target count of useful tiles is reached
//!
//! All parameters are validated against every slide before the first tile
//! is read, so a configuration error never leaves a partial dataset behind.

pub mod grid;
pub mod rejection;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use crate::error::{ConfigError, CropError};
use crate::slide::{Slide, SlideRegistry, TiffOpener, DEFAULT_TILE_CACHE_CAPACITY};
use crate::tile::{
    DominantColorClassifier, OutputFormat, OutputWriter, TileClassifier, TileEncoder,
    DEFAULT_JPEG_QUALITY,
};

pub use grid::{crop_grid, crop_slide, plan_all, GridPlan};
pub use rejection::{
    attempt_budget, crop_random, sampling_rng, SamplingOutcome, SamplingPool,
    DEFAULT_ATTEMPTS_PER_TILE,
};

/// Default tile width and height.
pub const DEFAULT_TILE_SIZE: (u32, u32) = (256, 256);

/// Default number of tiles for random sampling.
pub const DEFAULT_COUNT: u64 = 10_000;

/// Default pyramid level.
pub const DEFAULT_LEVEL: usize = 2;

/// Tile position strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Every cell of a regular grid over each slide
    Grid,
    /// Uniformly random positions until the target count is met
    #[default]
    Random,
}

// =============================================================================
// Options
// =============================================================================

/// Parameters of one tiling run.
#[derive(Debug, Clone, PartialEq)]
pub struct CropOptions {
    pub method: Method,
    pub level: usize,
    /// Tile width and height in level pixels
    pub tile_size: (u32, u32),
    /// Grid only: fraction of a tile shared with its neighbour, in [0, 1)
    pub overlap: f64,
    /// Random only: number of useful tiles to write
    pub count: u64,
    pub destination: PathBuf,
    /// Random only: seed for reproducible sampling
    pub seed: Option<u64>,
    /// Random only: attempt budget, defaults to 1000 per requested tile
    pub max_attempts: Option<u64>,
    pub format: OutputFormat,
    pub jpeg_quality: u8,
    /// Decoded source tiles cached per slide
    pub tile_cache: usize,
}

impl CropOptions {
    /// Options with default values writing into `destination`.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            method: Method::default(),
            level: DEFAULT_LEVEL,
            tile_size: DEFAULT_TILE_SIZE,
            overlap: 0.0,
            count: DEFAULT_COUNT,
            destination: destination.into(),
            seed: None,
            max_attempts: None,
            format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            tile_cache: DEFAULT_TILE_CACHE_CAPACITY,
        }
    }

    /// Check the options that do not depend on any slide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tile(self.tile_size, self.overlap)?;
        if self.method == Method::Random && self.count == 0 {
            return Err(ConfigError::InvalidCount);
        }
        Ok(())
    }
}

/// Tile sides must be positive and overlap must lie in [0, 1).
pub(crate) fn validate_tile(tile: (u32, u32), overlap: f64) -> Result<(), ConfigError> {
    if tile.0 == 0 || tile.1 == 0 {
        return Err(ConfigError::InvalidTileSize {
            width: tile.0,
            height: tile.1,
        });
    }
    if !(0.0..1.0).contains(&overlap) {
        return Err(ConfigError::InvalidOverlap(overlap));
    }
    Ok(())
}

// =============================================================================
// Report
// =============================================================================

/// Per-slide tally of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideReport {
    pub slide: String,
    /// Tiles read and classified
    pub candidates: u64,
    /// Tiles accepted and written
    pub written: u64,
}

impl SlideReport {
    pub fn new(slide: &str) -> Self {
        Self {
            slide: slide.to_string(),
            candidates: 0,
            written: 0,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub method: Method,
    pub level: usize,
    pub slides: usize,
    pub tiles_written: u64,
    /// Candidate tiles read, accepted or not
    pub attempts: u64,
    pub destination: PathBuf,
    pub per_slide: Vec<SlideReport>,
}

// =============================================================================
// Entry Points
// =============================================================================

/// Discover slides under `folders`, then tile them with the default classifier.
///
/// Returns the report of written tiles, or the first error; opening, config
/// and write failures all abort the run.
pub fn run<P: AsRef<Path>>(
    folders: &[P],
    extension: &str,
    options: &CropOptions,
) -> Result<RunReport, CropError> {
    options.validate()?;

    let opener = TiffOpener {
        tile_cache_capacity: options.tile_cache,
    };
    let registry = SlideRegistry::open(folders, extension, &opener)?;

    run_with(&registry, options, &DominantColorClassifier::default())
}

/// Tile already opened slides with a caller-provided classifier.
pub fn run_with<S, C>(
    registry: &SlideRegistry<S>,
    options: &CropOptions,
    classifier: &C,
) -> Result<RunReport, CropError>
where
    S: Slide,
    C: TileClassifier + ?Sized,
{
    options.validate()?;
    let slides = registry.slides();
    let encoder = TileEncoder::new(options.format, options.jpeg_quality);

    let (per_slide, attempts, written) = match options.method {
        Method::Grid => {
            let plans = plan_all(slides, options.level, options.tile_size, options.overlap)?;
            let mut writer = OutputWriter::new(&options.destination, encoder)?;
            info!(
                slides = slides.len(),
                level = options.level,
                candidates = plans.iter().map(GridPlan::cell_count).sum::<u64>(),
                "Starting grid tiling"
            );

            let per_slide = crop_grid(
                slides,
                &plans,
                options.level,
                options.tile_size,
                classifier,
                &mut writer,
            )?;
            let attempts = per_slide.iter().map(|r| r.candidates).sum();
            (per_slide, attempts, writer.written())
        }
        Method::Random => {
            let pool = SamplingPool::new(slides, options.level, options.tile_size)?;
            let budget = attempt_budget(options.count, options.max_attempts);
            let mut writer = OutputWriter::new(&options.destination, encoder)?;
            let mut rng = sampling_rng(options.seed);
            info!(
                slides = pool.len(),
                level = options.level,
                target = options.count,
                budget,
                seed = ?options.seed,
                "Starting random sampling"
            );

            let outcome = crop_random(
                &pool,
                options.count,
                budget,
                classifier,
                &mut rng,
                &mut writer,
            )?;
            (outcome.per_slide, outcome.attempts, writer.written())
        }
    };

    Ok(RunReport {
        method: options.method,
        level: options.level,
        slides: slides.len(),
        tiles_written: written as u64,
        attempts,
        destination: options.destination.clone(),
        per_slide,
    })
}

// =============================================================================
// Tests
// =============================================================================
