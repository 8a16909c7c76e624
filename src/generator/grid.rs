//! Exhaustive grid tiling.
//!
//! A slide level is covered by a regular grid whose step is the tile size
//! reduced by the overlap ratio:
//!
//! ```text
//! stride  = floor(tile * (1 - overlap))
//! columns = floor((width  - tile_w) / stride_x) + 1
//! rows    = floor((height - tile_h) / stride_y) + 1
//! ```
//!
//! The far-edge strip narrower than one stride is not covered. Cells are
//! visited column by column (`i` outer, `j` inner) and each cell origin is
//! scaled back to level-0 space by the level downsample.

use tracing::{debug, info};

use crate::error::{ConfigError, CropError};
use crate::slide::Slide;
use crate::tile::{NamingScheme, OutputWriter, TileClassifier, TileNamer, TileRequest};

use super::SlideReport;

/// Horizontal or vertical grid step for a tile side and overlap ratio.
pub fn stride(tile: u32, overlap: f64) -> u32 {
    (tile as f64 * (1.0 - overlap)).floor() as u32
}

/// Number of grid cells along one axis, or `None` if the tile does not fit.
pub fn axis_count(extent: u32, tile: u32, stride: u32) -> Option<u32> {
    if extent < tile || stride == 0 {
        return None;
    }
    Some((extent - tile) / stride + 1)
}

// =============================================================================
// Grid Plan
// =============================================================================

/// Grid layout for one slide at one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlan {
    /// Step between cell origins, in level pixels
    pub stride: (u32, u32),
    pub columns: u32,
    pub rows: u32,
    /// Level-to-level-0 scale factor
    pub downsample: f64,
}

impl GridPlan {
    /// Plan a grid over `extent` level pixels.
    ///
    /// # Errors
    /// `InvalidTileSize`, `InvalidOverlap` and `ZeroStride` for bad
    /// parameters; `TileExceedsSlide` (with an empty slide name) when the
    /// tile is larger than the extent.
    pub fn new(
        extent: (u32, u32),
        tile: (u32, u32),
        overlap: f64,
        downsample: f64,
    ) -> Result<Self, ConfigError> {
        super::validate_tile(tile, overlap)?;

        let stride = (stride(tile.0, overlap), stride(tile.1, overlap));
        if stride.0 == 0 || stride.1 == 0 {
            return Err(ConfigError::ZeroStride {
                width: tile.0,
                height: tile.1,
                overlap,
            });
        }

        match (
            axis_count(extent.0, tile.0, stride.0),
            axis_count(extent.1, tile.1, stride.1),
        ) {
            (Some(columns), Some(rows)) => Ok(Self {
                stride,
                columns,
                rows,
                downsample,
            }),
            _ => Err(ConfigError::TileExceedsSlide {
                slide: String::new(),
                level: 0,
                tile_width: tile.0,
                tile_height: tile.1,
                width: extent.0,
                height: extent.1,
            }),
        }
    }

    /// Plan a grid over a slide level.
    pub fn for_slide<S: Slide>(
        slide: &S,
        level: usize,
        tile: (u32, u32),
        overlap: f64,
    ) -> Result<Self, ConfigError> {
        let info = slide
            .level_info(level)
            .ok_or_else(|| ConfigError::LevelOutOfRange {
                slide: slide.id().to_string(),
                level,
                level_count: slide.level_count(),
            })?;

        Self::new((info.width, info.height), tile, overlap, info.downsample).map_err(|e| match e {
            ConfigError::TileExceedsSlide {
                tile_width,
                tile_height,
                width,
                height,
                ..
            } => ConfigError::TileExceedsSlide {
                slide: slide.id().to_string(),
                level,
                tile_width,
                tile_height,
                width,
                height,
            },
            other => other,
        })
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }

    /// Cell indices `(i, j)` in visiting order: column-major.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> {
        let rows = self.rows;
        (0..self.columns).flat_map(move |i| (0..rows).map(move |j| (i, j)))
    }

    /// Top-left corner of cell `(i, j)` in level-0 space.
    pub fn origin(&self, i: u32, j: u32) -> (u64, u64) {
        let scale = |step: u32, index: u32| {
            (index as f64 * step as f64 * self.downsample).round() as u64
        };
        (scale(self.stride.0, i), scale(self.stride.1, j))
    }
}

// =============================================================================
// Grid Generation
// =============================================================================

/// Validate a grid over every slide before any tile is read.
pub fn plan_all<S: Slide>(
    slides: &[S],
    level: usize,
    tile: (u32, u32),
    overlap: f64,
) -> Result<Vec<GridPlan>, ConfigError> {
    slides
        .iter()
        .map(|slide| GridPlan::for_slide(slide, level, tile, overlap))
        .collect()
}

/// Walk one slide's grid, writing every useful tile.
///
/// Acceptance indices restart at zero for each slide; the slide identifier
/// in the filename keeps names unique across slides.
pub fn crop_slide<S, C>(
    slide: &S,
    plan: &GridPlan,
    level: usize,
    tile: (u32, u32),
    classifier: &C,
    writer: &mut OutputWriter,
) -> Result<SlideReport, CropError>
where
    S: Slide,
    C: TileClassifier + ?Sized,
{
    let namer = TileNamer::new(NamingScheme::SlideFirst, plan.cell_count(), writer.extension());
    let mut report = SlideReport::new(slide.id());

    for (i, j) in plan.cells() {
        let request = TileRequest::new(slide, level, plan.origin(i, j), tile);
        let pixels = request.resolve()?;
        report.candidates += 1;

        if !classifier.is_useful(&pixels) {
            debug!(slide = %slide.id(), i, j, "Skipping background tile");
            continue;
        }

        let name = namer.name(report.written, slide.id(), level);
        writer.write(&name, &pixels)?;
        report.written += 1;
    }

    info!(
        slide = %slide.id(),
        columns = plan.columns,
        rows = plan.rows,
        written = report.written,
        "Grid tiling complete"
    );
    Ok(report)
}

/// Grid-tile every slide in order.
pub fn crop_grid<S, C>(
    slides: &[S],
    plans: &[GridPlan],
    level: usize,
    tile: (u32, u32),
    classifier: &C,
    writer: &mut OutputWriter,
) -> Result<Vec<SlideReport>, CropError>
where
    S: Slide,
    C: TileClassifier + ?Sized,
{
    slides
        .iter()
        .zip(plans)
        .map(|(slide, plan)| crop_slide(slide, plan, level, tile, classifier, writer))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
