//! Random rejection sampling.
//!
//! Each attempt picks a slide uniformly from the pool, then a top-left
//! corner uniformly in `[0, extent - tile)` on each axis of the chosen
//! level. Useful tiles are written until the target count is reached.
//!
//! The loop is bounded by an attempt budget so background-only pools fail
//! with [`CropError::TargetNotMet`] instead of spinning forever.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::{ConfigError, CropError};
use crate::slide::Slide;
use crate::tile::{NamingScheme, OutputWriter, TileClassifier, TileNamer, TileRequest};

use super::SlideReport;

/// Attempts allowed per requested tile when no explicit budget is given.
pub const DEFAULT_ATTEMPTS_PER_TILE: u64 = 1000;

/// Accepted-tile interval between progress log lines.
const PROGRESS_INTERVAL: u64 = 1000;

/// Total attempts allowed to collect `count` tiles.
pub fn attempt_budget(count: u64, max_attempts: Option<u64>) -> u64 {
    max_attempts.unwrap_or_else(|| count.saturating_mul(DEFAULT_ATTEMPTS_PER_TILE))
}

/// Random source for sampling: seeded for reproducible runs, OS entropy otherwise.
pub fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

// =============================================================================
// Sampling Pool
// =============================================================================

struct PoolEntry<'a, S> {
    slide: &'a S,
    /// Exclusive upper bound of the top-left corner, in level pixels
    range: (u32, u32),
    downsample: f64,
}

/// Slides validated for sampling at one level and tile size.
pub struct SamplingPool<'a, S> {
    entries: Vec<PoolEntry<'a, S>>,
    level: usize,
    tile: (u32, u32),
}

impl<'a, S: Slide> SamplingPool<'a, S> {
    /// Check every slide can host a tile at `level`.
    ///
    /// # Errors
    /// `EmptyPool` with no slides, `LevelOutOfRange` if a slide lacks the
    /// level, `TileExceedsSlide` unless the level is strictly larger than
    /// the tile on both axes (the sampling range would be empty).
    pub fn new(slides: &'a [S], level: usize, tile: (u32, u32)) -> Result<Self, ConfigError> {
        if slides.is_empty() {
            return Err(ConfigError::EmptyPool);
        }

        let entries = slides
            .iter()
            .map(|slide| {
                let info = slide
                    .level_info(level)
                    .ok_or_else(|| ConfigError::LevelOutOfRange {
                        slide: slide.id().to_string(),
                        level,
                        level_count: slide.level_count(),
                    })?;

                if info.width <= tile.0 || info.height <= tile.1 {
                    return Err(ConfigError::TileExceedsSlide {
                        slide: slide.id().to_string(),
                        level,
                        tile_width: tile.0,
                        tile_height: tile.1,
                        width: info.width,
                        height: info.height,
                    });
                }

                Ok(PoolEntry {
                    slide,
                    range: (info.width - tile.0, info.height - tile.1),
                    downsample: info.downsample,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            entries,
            level,
            tile,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw one candidate: slide index and request.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, TileRequest<'a, S>) {
        let index = rng.random_range(0..self.entries.len());
        let entry = &self.entries[index];

        let x = rng.random_range(0..entry.range.0);
        let y = rng.random_range(0..entry.range.1);
        let location = (
            (x as f64 * entry.downsample).round() as u64,
            (y as f64 * entry.downsample).round() as u64,
        );

        (
            index,
            TileRequest::new(entry.slide, self.level, location, self.tile),
        )
    }
}

// =============================================================================
// Sampling Loop
// =============================================================================

/// Outcome of a completed sampling run.
#[derive(Debug, Clone)]
pub struct SamplingOutcome {
    pub per_slide: Vec<SlideReport>,
    pub attempts: u64,
}

/// Sample until exactly `count` useful tiles are written.
///
/// # Errors
/// `InvalidCount` for a zero target, `TargetNotMet` once `budget` attempts
/// are spent, and any read or write failure.
pub fn crop_random<S, C, R>(
    pool: &SamplingPool<'_, S>,
    count: u64,
    budget: u64,
    classifier: &C,
    rng: &mut R,
    writer: &mut OutputWriter,
) -> Result<SamplingOutcome, CropError>
where
    S: Slide,
    C: TileClassifier + ?Sized,
    R: Rng + ?Sized,
{
    if count == 0 {
        return Err(ConfigError::InvalidCount.into());
    }

    let namer = TileNamer::new(NamingScheme::IndexFirst, count, writer.extension());
    let mut per_slide: Vec<SlideReport> = pool
        .entries
        .iter()
        .map(|entry| SlideReport::new(entry.slide.id()))
        .collect();

    let mut accepted = 0u64;
    let mut attempts = 0u64;

    while accepted < count {
        if attempts >= budget {
            return Err(CropError::TargetNotMet {
                accepted,
                target: count,
                attempts,
            });
        }
        attempts += 1;

        let (index, request) = pool.sample(rng);
        let pixels = request.resolve()?;
        per_slide[index].candidates += 1;

        if !classifier.is_useful(&pixels) {
            debug!(
                slide = %request.slide.id(),
                x = request.location.0,
                y = request.location.1,
                "Rejected background tile"
            );
            continue;
        }

        let name = namer.name(accepted, request.slide.id(), pool.level);
        writer.write(&name, &pixels)?;
        per_slide[index].written += 1;
        accepted += 1;

        if accepted % PROGRESS_INTERVAL == 0 {
            info!(accepted, target = count, attempts, "Sampling progress");
        }
    }

    info!(
        written = accepted,
        attempts,
        acceptance = accepted as f64 / attempts as f64,
        "Random sampling complete"
    );
    Ok(SamplingOutcome {
        per_slide,
        attempts,
    })
}

// =============================================================================
// Tests
// =============================================================================
