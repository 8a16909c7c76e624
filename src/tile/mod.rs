//! Tile layer.
//!
//! Everything between a slide and a file on disk:
//!
//! ```text
//! ┌─────────────┐   resolve   ┌──────────────┐  useful?  ┌──────────────┐
//! │ TileRequest │ ──────────▶ │  RgbaImage   │ ────────▶ │ OutputWriter │
//! └─────────────┘             └──────────────┘           └──────────────┘
//!                                    │                          │
//!                              TileClassifier          TileNamer + TileEncoder
//! ```
//!
//! # Components
//!
//! - [`TileRequest`]: one candidate position on a slide
//! - [`TileClassifier`] / [`DominantColorClassifier`]: keeps tissue, drops background
//! - [`TileNamer`]: zero-padded, lexicographically ordered filenames
//! - [`TileEncoder`]: PNG or JPEG encoding
//! - [`OutputWriter`]: writes accepted tiles, refusing duplicate names

mod classifier;
mod encoder;
mod writer;

use image::RgbaImage;

use crate::error::CropError;
use crate::slide::Slide;

pub use classifier::{
    dominant_color, is_background, thumbnail_dimensions, DominantColorClassifier, TileClassifier,
    DEFAULT_GRAY_TOLERANCE, DEFAULT_THUMBNAIL_SIZE,
};
pub use encoder::{
    clamp_quality, is_valid_quality, OutputFormat, TileEncoder, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use writer::{index_width, NamingScheme, OutputWriter, TileNamer};

/// A candidate tile: where to read, at which level, and how large.
#[derive(Debug)]
pub struct TileRequest<'a, S> {
    pub slide: &'a S,
    pub level: usize,
    /// Top-left corner in level-0 pixel space
    pub location: (u64, u64),
    /// Width and height in level pixels
    pub size: (u32, u32),
}

impl<S> Clone for TileRequest<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for TileRequest<'_, S> {}

impl<'a, S: Slide> TileRequest<'a, S> {
    pub fn new(slide: &'a S, level: usize, location: (u64, u64), size: (u32, u32)) -> Self {
        Self {
            slide,
            level,
            location,
            size,
        }
    }

    /// Read the tile's pixels from its slide.
    ///
    /// Any read failure is fatal for the run.
    pub fn resolve(&self) -> Result<RgbaImage, CropError> {
        self.slide
            .read_region(self.location, self.level, self.size)
            .map_err(|source| CropError::Read {
                slide: self.slide.id().to_string(),
                location: self.location,
                level: self.level,
                source,
            })
    }
}
