//! Tile usefulness classification.
//!
//! The default heuristic looks at a tile's dominant colour: slide glass and
//! scanner padding are gray or transparent, stained tissue is not. The
//! dominant colour is taken from a small thumbnail to keep the histogram
//! cheap.

use std::collections::HashMap;

use image::{imageops, Rgba, RgbaImage};

/// Longest side of the thumbnail the histogram is computed on.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 32;

/// Maximum pairwise RGB difference for a colour to count as gray.
pub const DEFAULT_GRAY_TOLERANCE: u8 = 10;

/// Decides whether a tile carries content worth keeping.
///
/// Any `Fn(&RgbaImage) -> bool` is a classifier.
pub trait TileClassifier {
    fn is_useful(&self, tile: &RgbaImage) -> bool;
}

impl<F> TileClassifier for F
where
    F: Fn(&RgbaImage) -> bool,
{
    fn is_useful(&self, tile: &RgbaImage) -> bool {
        self(tile)
    }
}

// =============================================================================
// Dominant Color Classifier
// =============================================================================

/// Rejects tiles whose most frequent thumbnail colour is transparent or gray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantColorClassifier {
    pub thumbnail_size: u32,
    pub gray_tolerance: u8,
}

impl Default for DominantColorClassifier {
    fn default() -> Self {
        Self {
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            gray_tolerance: DEFAULT_GRAY_TOLERANCE,
        }
    }
}

impl DominantColorClassifier {
    /// Dominant colour of the tile's thumbnail.
    pub fn dominant_color(&self, tile: &RgbaImage) -> Option<Rgba<u8>> {
        let (width, height) = thumbnail_dimensions(tile.width(), tile.height(), self.thumbnail_size);
        if (width, height) == tile.dimensions() {
            return dominant_color(tile);
        }
        dominant_color(&imageops::thumbnail(tile, width, height))
    }
}

impl TileClassifier for DominantColorClassifier {
    fn is_useful(&self, tile: &RgbaImage) -> bool {
        match self.dominant_color(tile) {
            Some(color) => !is_background(color, self.gray_tolerance),
            None => false,
        }
    }
}

/// Fit `(width, height)` inside a `max`×`max` box, keeping aspect ratio.
///
/// Never upscales; each side is at least 1.
pub fn thumbnail_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let max = max.max(1);
    if width <= max && height <= max {
        return (width, height);
    }

    let scale = (max as f64 / width as f64).min(max as f64 / height as f64);
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (scaled(width), scaled(height))
}

/// Most frequent colour of an image.
///
/// Ties go to the colour that appears first in row-major order. Returns
/// `None` for an empty image.
pub fn dominant_color(image: &RgbaImage) -> Option<Rgba<u8>> {
    // colour -> (count, first position)
    let mut counts: HashMap<[u8; 4], (u32, usize)> = HashMap::new();
    for (position, pixel) in image.pixels().enumerate() {
        counts.entry(pixel.0).or_insert((0, position)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(color, _)| Rgba(color))
}

/// True when a colour is fully transparent or achromatic within `tolerance`.
pub fn is_background(color: Rgba<u8>, tolerance: u8) -> bool {
    let [r, g, b, a] = color.0;
    if a == 0 {
        return true;
    }
    r.abs_diff(g) <= tolerance && r.abs_diff(b) <= tolerance && g.abs_diff(b) <= tolerance
}

// =============================================================================
// Tests
// =============================================================================
