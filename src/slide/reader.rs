//! Slide trait for format-agnostic region reads.
//!
//! The tile generators only ever talk to this trait, so test doubles and
//! alternative decoders can stand in for [`super::TiffSlide`].

use image::RgbaImage;
use serde::Serialize;

use crate::error::SlideError;

// =============================================================================
// Level Information
// =============================================================================

/// Information about a single pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelInfo {
    /// Width of this level in pixels
    pub width: u32,

    /// Height of this level in pixels
    pub height: u32,

    /// Downsample factor relative to level 0
    pub downsample: f64,
}

// =============================================================================
// Slide Trait
// =============================================================================

/// An opened pyramidal image.
///
/// Level 0 is the full-resolution image; each further level is a
/// downsampled copy. Region locations are always given in level-0 pixel
/// space, whichever level is read.
pub trait Slide {
    /// Stable identifier used in output filenames (file stem of the source).
    fn id(&self) -> &str;

    /// Number of pyramid levels.
    fn level_count(&self) -> usize;

    /// Dimensions `(width, height)` of a level, or `None` if out of range.
    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)>;

    /// Downsample factor of a level relative to level 0.
    ///
    /// Defaults to `2^level`, the factor of a dyadic pyramid.
    fn level_downsample(&self, level: usize) -> Option<f64> {
        if level >= self.level_count() {
            return None;
        }
        Some(2f64.powi(level as i32))
    }

    /// Read a `size` region at `level` whose top-left corner is `location` in
    /// level-0 coordinates.
    ///
    /// The result is always exactly `size`; pixels outside the level are
    /// fully transparent.
    fn read_region(
        &self,
        location: (u64, u64),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbaImage, SlideError>;

    /// Get complete information about a level.
    fn level_info(&self, level: usize) -> Option<LevelInfo> {
        let (width, height) = self.level_dimensions(level)?;
        let downsample = self.level_downsample(level)?;
        Some(LevelInfo {
            width,
            height,
            downsample,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
