//! Pyramidal TIFF slide.
//!
//! Serves [`Slide::read_region`] by stitching decoded source tiles. Decoded
//! tiles are kept in a small LRU cache because overlapping grid tiles and
//! neighbouring requests hit the same source tiles repeatedly.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use lru::LruCache;
use tracing::debug;

use crate::error::{SlideError, TiffError};
use crate::format::decode_jpeg_tile;
use crate::format::tiff::{Compression, PyramidLevel, TiffPyramid, TileData};
use crate::io::{FileRangeReader, RangeReader};

use super::reader::Slide;

/// Default number of decoded source tiles cached per slide.
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 64;

/// Cache key: (level index, tile index within level)
type TileKey = (usize, u32);

/// A tiled pyramidal TIFF (Aperio SVS or generic pyramidal TIFF).
pub struct TiffSlide<R: RangeReader = FileRangeReader> {
    id: String,
    reader: R,
    pyramid: TiffPyramid,
    tile_data: Vec<TileData>,
    cache: Mutex<LruCache<TileKey, Arc<RgbaImage>>>,
}

impl TiffSlide<FileRangeReader> {
    /// Open a slide file from disk.
    pub fn open_path(
        path: &Path,
        id: impl Into<String>,
        cache_capacity: usize,
    ) -> Result<Self, TiffError> {
        let reader = FileRangeReader::open(path)?;
        Self::open(reader, id, cache_capacity)
    }
}

impl<R: RangeReader> TiffSlide<R> {
    /// Parse the pyramid and load every level's tile tables.
    pub fn open(reader: R, id: impl Into<String>, cache_capacity: usize) -> Result<Self, TiffError> {
        let pyramid = TiffPyramid::parse(&reader)?;
        let tile_data = pyramid
            .levels
            .iter()
            .map(|level| TileData::load(&reader, level, &pyramid.header))
            .collect::<Result<Vec<_>, _>>()?;

        let id = id.into();
        debug!(
            slide = %id,
            source = reader.identifier(),
            levels = pyramid.level_count(),
            "Opened pyramidal TIFF"
        );

        Ok(Self {
            id,
            reader,
            pyramid,
            tile_data,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    /// The parsed pyramid structure.
    pub fn pyramid(&self) -> &TiffPyramid {
        &self.pyramid
    }

    /// Get a decoded source tile, from cache when possible.
    fn tile(&self, level: &PyramidLevel, tile_x: u32, tile_y: u32) -> Result<Arc<RgbaImage>, TiffError> {
        let index = level
            .tile_index(tile_x, tile_y)
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: "TileOffsets",
                message: format!("tile ({}, {}) outside level {}", tile_x, tile_y, level.level_index),
            })?;
        let key = (level.level_index, index);

        if let Some(hit) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(Arc::clone(hit));
        }

        let tile = Arc::new(self.decode_tile(level, index)?);
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, Arc::clone(&tile));
        Ok(tile)
    }

    fn decode_tile(&self, level: &PyramidLevel, index: u32) -> Result<RgbaImage, TiffError> {
        let data = &self.tile_data[level.level_index];
        let (offset, byte_count) =
            data.get_tile_location(index)
                .ok_or_else(|| TiffError::InvalidTagValue {
                    tag: "TileOffsets",
                    message: format!("no entry for tile {}", index),
                })?;
        let len = usize::try_from(byte_count).map_err(|_| TiffError::InvalidTagValue {
            tag: "TileByteCounts",
            message: format!("tile of {} bytes is too large", byte_count),
        })?;
        let bytes = self.reader.read_exact_at(offset, len)?;

        match level.compression()? {
            Compression::Jpeg => decode_jpeg_tile(data.jpeg_tables.as_deref(), &bytes),
            Compression::None => decode_raw_tile(
                &bytes,
                level.tile_width,
                level.tile_height,
                level.samples_per_pixel,
            ),
        }
    }
}

impl<R: RangeReader> Slide for TiffSlide<R> {
    fn id(&self) -> &str {
        &self.id
    }

    fn level_count(&self) -> usize {
        self.pyramid.level_count()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.pyramid.get_level(level).map(|l| (l.width, l.height))
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.pyramid.get_level(level).map(|l| l.downsample)
    }

    fn read_region(
        &self,
        location: (u64, u64),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbaImage, SlideError> {
        let info = self
            .pyramid
            .get_level(level)
            .ok_or(SlideError::LevelOutOfRange {
                level,
                level_count: self.level_count(),
            })?;

        let (width, height) = size;
        let mut region = RgbaImage::new(width, height);

        // Region origin in level space. Rounding inverts the generators'
        // rounded level-to-level-0 scaling for any downsample >= 1.
        let origin_x = (location.0 as f64 / info.downsample).round() as i64;
        let origin_y = (location.1 as f64 / info.downsample).round() as i64;

        // Part of the region that overlaps the level image
        let x0 = origin_x.max(0);
        let y0 = origin_y.max(0);
        let x1 = (origin_x + width as i64).min(info.width as i64);
        let y1 = (origin_y + height as i64).min(info.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return Ok(region);
        }

        let tile_w = info.tile_width as i64;
        let tile_h = info.tile_height as i64;

        for tile_y in (y0 / tile_h)..=((y1 - 1) / tile_h) {
            for tile_x in (x0 / tile_w)..=((x1 - 1) / tile_w) {
                let tile = self.tile(info, tile_x as u32, tile_y as u32)?;
                let left = tile_x * tile_w;
                let top = tile_y * tile_h;

                for y in y0.max(top)..y1.min(top + tile_h) {
                    for x in x0.max(left)..x1.min(left + tile_w) {
                        let (tx, ty) = ((x - left) as u32, (y - top) as u32);
                        if tx < tile.width() && ty < tile.height() {
                            region.put_pixel(
                                (x - origin_x) as u32,
                                (y - origin_y) as u32,
                                *tile.get_pixel(tx, ty),
                            );
                        }
                    }
                }
            }
        }

        Ok(region)
    }
}

/// Convert raw chunky RGB or RGBA samples to an RGBA tile.
fn decode_raw_tile(
    bytes: &[u8],
    width: u32,
    height: u32,
    samples_per_pixel: u16,
) -> Result<RgbaImage, TiffError> {
    let samples = samples_per_pixel as usize;
    let expected = width as usize * height as usize * samples;
    if bytes.len() < expected {
        return Err(TiffError::Decode(format!(
            "raw tile has {} bytes, expected {}",
            bytes.len(),
            expected
        )));
    }

    let mut tile = RgbaImage::new(width, height);
    for (pixel, chunk) in tile.pixels_mut().zip(bytes.chunks_exact(samples)) {
        let alpha = if samples == 4 { chunk[3] } else { 255 };
        *pixel = Rgba([chunk[0], chunk[1], chunk[2], alpha]);
    }
    Ok(tile)
}
