//! TIFF pyramid level identification.
//!
//! A slide file holds several IFDs: the resolution pyramid plus label,
//! macro, and thumbnail images. Pyramid levels are identified by:
//! 1. Being tiled (TileWidth/TileLength plus offset tables)
//! 2. Being strictly smaller than the previous level
//! 3. Sharing the aspect ratio of the largest tiled image (level 0)
//!
//! Label and thumbnail images are strip-organised in SVS files and are
//! skipped by rule 1; tiled macro images fail rule 3.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::{Compression, TiffTag};
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs to parse (safety limit)
const MAX_IFDS: usize = 100;

/// Maximum relative aspect-ratio deviation from level 0
const ASPECT_TOLERANCE: f64 = 0.1;

// =============================================================================
// PyramidLevel
// =============================================================================

/// A single level in the image pyramid.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Index of this level in the pyramid (0 = highest resolution)
    pub level_index: usize,

    /// Index of the IFD in the file's IFD chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,

    /// Number of tiles in X direction
    pub tiles_x: u32,

    /// Number of tiles in Y direction
    pub tiles_y: u32,

    /// Downsample factor relative to level 0 (1.0 for level 0)
    pub downsample: f64,

    /// Raw Compression tag value (1 when absent)
    pub compression_raw: u16,

    /// Samples per pixel (1 when absent)
    pub samples_per_pixel: u16,

    /// Planar configuration (1 = chunky)
    pub planar_configuration: u16,

    pub tile_offsets_entry: IfdEntry,
    pub tile_byte_counts_entry: IfdEntry,
    pub jpeg_tables_entry: Option<IfdEntry>,
}

impl PyramidLevel {
    /// Create a PyramidLevel from a parsed IFD.
    ///
    /// Returns None if the IFD is not tiled or lacks tile tables.
    fn from_ifd(ifd: &Ifd, ifd_index: usize, byte_order: ByteOrder) -> Option<Self> {
        let tile_width = ifd.get_u32(TiffTag::TileWidth, byte_order)?;
        let tile_height = ifd.get_u32(TiffTag::TileLength, byte_order)?;
        let width = ifd.get_u32(TiffTag::ImageWidth, byte_order)?;
        let height = ifd.get_u32(TiffTag::ImageLength, byte_order)?;
        if tile_width == 0 || tile_height == 0 || width == 0 || height == 0 {
            return None;
        }

        let short = |tag: TiffTag, default: u16| {
            ifd.get_u64(tag, byte_order)
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(default)
        };

        Some(PyramidLevel {
            level_index: 0,
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width),
            tiles_y: height.div_ceil(tile_height),
            downsample: 1.0,
            compression_raw: short(TiffTag::Compression, 1),
            samples_per_pixel: short(TiffTag::SamplesPerPixel, 1),
            planar_configuration: short(TiffTag::PlanarConfiguration, 1),
            tile_offsets_entry: ifd.get(TiffTag::TileOffsets)?.clone(),
            tile_byte_counts_entry: ifd.get(TiffTag::TileByteCounts)?.clone(),
            jpeg_tables_entry: ifd.get(TiffTag::JpegTables).cloned(),
        })
    }

    /// Get the tile index for a given tile coordinate.
    ///
    /// Returns None if the coordinates are out of bounds.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u32> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y * self.tiles_x + tile_x)
    }

    /// Total number of tiles in this level.
    pub fn tile_count(&self) -> u64 {
        self.tiles_x as u64 * self.tiles_y as u64
    }

    /// Check that tiles of this level can be decoded.
    pub fn compression(&self) -> Result<Compression, TiffError> {
        let compression = Compression::from_u16(self.compression_raw)
            .ok_or(TiffError::UnsupportedCompression(self.compression_raw))?;

        if compression == Compression::None
            && (self.planar_configuration != 1 || !matches!(self.samples_per_pixel, 3 | 4))
        {
            return Err(TiffError::UnsupportedSamples {
                samples_per_pixel: self.samples_per_pixel,
            });
        }

        Ok(compression)
    }

    fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// A parsed TIFF image pyramid, sorted by resolution (level 0 = highest).
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,
    pub levels: Vec<PyramidLevel>,
}

impl TiffPyramid {
    /// Parse a TIFF file and identify pyramid levels.
    ///
    /// # Errors
    /// Header/IFD errors, `NoPyramid` when no tiled image exists, and
    /// `UnsupportedCompression`/`UnsupportedSamples` for undecodable levels.
    pub fn parse<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, TiffError> {
        let header_len = BIGTIFF_HEADER_SIZE.min(reader.size() as usize);
        let header_bytes = reader.read_exact_at(0, header_len)?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header)?;
        let pyramid = Self::build_pyramid(header, &ifds)?;

        for level in &pyramid.levels {
            level.compression()?;
        }

        Ok(pyramid)
    }

    /// Parse all IFDs in the file following the next-IFD chain.
    fn parse_all_ifds<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if offset >= reader.size() {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let count_bytes = reader.read_exact_at(offset, header.ifd_count_size())?;
            let entry_count = Ifd::entry_count(&count_bytes, header)?;

            let ifd_bytes =
                reader.read_exact_at(offset, Ifd::calculate_size(entry_count, header))?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    /// Build the pyramid structure from parsed IFDs.
    fn build_pyramid(header: TiffHeader, ifds: &[Ifd]) -> Result<Self, TiffError> {
        let mut candidates: Vec<PyramidLevel> = ifds
            .iter()
            .enumerate()
            .filter_map(|(idx, ifd)| PyramidLevel::from_ifd(ifd, idx, header.byte_order))
            .collect();

        // Largest first = level 0
        candidates.sort_by(|a, b| {
            let area_a = a.width as u64 * a.height as u64;
            let area_b = b.width as u64 * b.height as u64;
            area_b.cmp(&area_a)
        });

        let levels = Self::filter_pyramid_levels(candidates);
        if levels.is_empty() {
            return Err(TiffError::NoPyramid);
        }

        Ok(TiffPyramid { header, levels })
    }

    /// Keep only candidates that shrink monotonically with level 0's aspect ratio.
    fn filter_pyramid_levels(candidates: Vec<PyramidLevel>) -> Vec<PyramidLevel> {
        let mut levels: Vec<PyramidLevel> = Vec::new();

        for mut level in candidates {
            if let Some(base) = levels.first() {
                let previous = &levels[levels.len() - 1];
                if level.width >= previous.width || level.height >= previous.height {
                    continue;
                }

                let relative = level.aspect_ratio() / base.aspect_ratio();
                if (relative - 1.0).abs() > ASPECT_TOLERANCE {
                    continue;
                }

                let downsample_x = base.width as f64 / level.width as f64;
                let downsample_y = base.height as f64 / level.height as f64;
                level.downsample = (downsample_x + downsample_y) / 2.0;
            }

            level.level_index = levels.len();
            levels.push(level);
        }

        levels
    }

    /// Get the number of pyramid levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Get a pyramid level by index.
    pub fn get_level(&self, level: usize) -> Option<&PyramidLevel> {
        self.levels.get(level)
    }
}

// =============================================================================
// Tile Data Loading
// =============================================================================

/// Loaded tile location tables for a pyramid level.
#[derive(Debug, Clone)]
pub struct TileData {
    /// Byte offset of each tile in the file
    pub offsets: Vec<u64>,

    /// Byte count (size) of each tile
    pub byte_counts: Vec<u64>,

    /// JPEGTables data (if present)
    pub jpeg_tables: Option<Bytes>,
}

impl TileData {
    /// Load tile data for a pyramid level.
    pub fn load<R: RangeReader + ?Sized>(
        reader: &R,
        level: &PyramidLevel,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);

        let offsets = values.read_u64_array(&level.tile_offsets_entry, "TileOffsets")?;
        let byte_counts =
            values.read_u64_array(&level.tile_byte_counts_entry, "TileByteCounts")?;

        let expected = level.tile_count();
        if (offsets.len() as u64) < expected || (byte_counts.len() as u64) < expected {
            return Err(TiffError::InvalidTagValue {
                tag: "TileOffsets",
                message: format!(
                    "level {} needs {} tiles, found {} offsets and {} byte counts",
                    level.level_index,
                    expected,
                    offsets.len(),
                    byte_counts.len()
                ),
            });
        }

        let jpeg_tables = level
            .jpeg_tables_entry
            .as_ref()
            .map(|entry| values.read_bytes(entry))
            .transpose()?;

        Ok(TileData {
            offsets,
            byte_counts,
            jpeg_tables,
        })
    }

    /// Get offset and size for a specific tile.
    pub fn get_tile_location(&self, tile_index: u32) -> Option<(u64, u64)> {
        let idx = tile_index as usize;
        Some((*self.offsets.get(idx)?, *self.byte_counts.get(idx)?))
    }
}

// =============================================================================
// Tests
// =============================================================================
