//! Tile encoder.
//!
//! Accepted tiles are RGBA buffers. PNG keeps the alpha channel; JPEG has
//! none, so alpha is dropped before encoding at the configured quality.

use bytes::Bytes;
use clap::ValueEnum;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError, RgbaImage};
use serde::Serialize;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// On-disk image format of written tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// File extension used in tile filenames.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

// =============================================================================
// Tile Encoder
// =============================================================================

/// Encodes RGBA tiles into the configured output format.
#[derive(Debug, Clone, Copy)]
pub struct TileEncoder {
    format: OutputFormat,
    quality: u8,
}

impl Default for TileEncoder {
    fn default() -> Self {
        Self::new(OutputFormat::Png, DEFAULT_JPEG_QUALITY)
    }
}

impl TileEncoder {
    /// Create an encoder. Quality is clamped to 1-100 and only used for JPEG.
    pub fn new(format: OutputFormat, quality: u8) -> Self {
        Self {
            format,
            quality: clamp_quality(quality),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a tile to bytes.
    pub fn encode(&self, tile: &RgbaImage) -> Result<Bytes, ImageError> {
        let mut output = Vec::new();

        match self.format {
            OutputFormat::Png => {
                PngEncoder::new(&mut output).write_image(
                    tile.as_raw(),
                    tile.width(),
                    tile.height(),
                    ExtendedColorType::Rgba8,
                )?;
            }
            OutputFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(tile.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut output, self.quality).encode_image(&rgb)?;
            }
        }

        Ok(Bytes::from(output))
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
