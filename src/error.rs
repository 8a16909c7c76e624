use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading slide bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Underlying filesystem failure
    #[error("I/O error on {path}: {message}")]
    Read { path: String, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0} (only uncompressed and JPEG tiles are supported)")]
    UnsupportedCompression(u16),

    /// Unsupported pixel layout for uncompressed tiles
    #[error("Unsupported sample layout: {samples_per_pixel} samples per pixel")]
    UnsupportedSamples { samples_per_pixel: u16 },

    /// No tiled image directory could serve as pyramid level 0
    #[error("No tiled pyramid levels found")]
    NoPyramid,

    /// Tile payload could not be decoded to pixels
    #[error("Failed to decode tile: {0}")]
    Decode(String),
}

/// Errors returned by a [`crate::slide::Slide`] when resolving a region.
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// Underlying TIFF structure or tile payload is broken
    #[error(transparent)]
    Tiff(#[from] TiffError),

    /// Requested pyramid level does not exist
    #[error("Level {level} out of range (slide has {level_count} levels)")]
    LevelOutOfRange { level: usize, level_count: usize },
}

/// Errors raised while discovering or opening source slides.
///
/// Any of these aborts startup before tile work begins.
#[derive(Debug, Error)]
pub enum OpenError {
    /// A folder tree could not be walked
    #[error("Failed to scan {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    /// A discovered file is not a readable pyramidal image
    #[error("Failed to open slide {path}: {source}")]
    Slide {
        path: PathBuf,
        #[source]
        source: TiffError,
    },
}

/// Invalid tiling parameters, reported before any generation loop starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Tile width or height is zero
    #[error("Tile size must be positive, got {width}x{height}")]
    InvalidTileSize { width: u32, height: u32 },

    /// Overlap ratio outside [0, 1)
    #[error("Overlap must be in [0, 1), got {0}")]
    InvalidOverlap(f64),

    /// Overlap so large that the stride rounds down to zero
    #[error("Stride is zero for tile size {width}x{height} with overlap {overlap}")]
    ZeroStride { width: u32, height: u32, overlap: f64 },

    /// Target count for random sampling is zero
    #[error("Number of tiles to produce must be positive")]
    InvalidCount,

    /// Random sampling was asked to draw from no slides
    #[error("No slides to sample from")]
    EmptyPool,

    /// Level does not exist on a slide
    #[error("Slide {slide} has {level_count} levels, level {level} requested")]
    LevelOutOfRange {
        slide: String,
        level: usize,
        level_count: usize,
    },

    /// Tile does not fit in the slide extent at the chosen level
    #[error(
        "Tile {tile_width}x{tile_height} does not fit slide {slide} at level {level} \
         ({width}x{height})"
    )]
    TileExceedsSlide {
        slide: String,
        level: usize,
        tile_width: u32,
        tile_height: u32,
        width: u32,
        height: u32,
    },
}

/// Errors that can occur when persisting accepted tiles
#[derive(Debug, Error)]
pub enum WriteError {
    /// Destination folder is missing, not a folder, or cannot be created
    #[error("Destination {path} is not writable: {message}")]
    Destination { path: PathBuf, message: String },

    /// Tile could not be encoded
    #[error("Failed to encode tile {name}: {message}")]
    Encode { name: String, message: String },

    /// Encoded tile could not be written to disk
    #[error("Failed to write {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The same filename was produced twice in one run
    #[error("Duplicate output filename: {0}")]
    DuplicateName(String),
}

/// Top-level error for a tiling run.
#[derive(Debug, Error)]
pub enum CropError {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// A region read failed; treated as pyramid corruption
    #[error("Failed to read region at {location:?} (level {level}) from slide {slide}: {source}")]
    Read {
        slide: String,
        location: (u64, u64),
        level: usize,
        #[source]
        source: SlideError,
    },

    /// Rejection sampling exhausted its attempt budget
    #[error(
        "Unable to collect {target} useful tiles: accepted {accepted} after {attempts} attempts"
    )]
    TargetNotMet {
        accepted: u64,
        target: u64,
        attempts: u64,
    },
}
