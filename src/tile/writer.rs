//! Output naming and persistence.
//!
//! Filenames embed a zero-padded acceptance index so a plain lexicographic
//! listing of the destination reproduces acceptance order:
//!
//! ```text
//! grid:    {slide}_{index}_{level}.{ext}    e.g. biopsy-12_007_2.png
//! random:  {index}_{slide}_{level}.{ext}    e.g. 0042_biopsy-12_2.png
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use image::RgbaImage;
use tracing::debug;

use crate::error::WriteError;

use super::encoder::TileEncoder;

/// Number of digits needed to zero-pad indices of `count` tiles.
///
/// This is `ceil(log10(count))`: 10 tiles need one digit (0..9), 11 need two.
/// Zero or one tile needs no padding.
pub fn index_width(count: u64) -> usize {
    let mut width = 0;
    let mut capacity: u64 = 1;
    while capacity < count {
        capacity = capacity.saturating_mul(10);
        width += 1;
    }
    width
}

// =============================================================================
// Tile Namer
// =============================================================================

/// Field order of a tile filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// `{slide}_{index}_{level}`, used by grid mode
    SlideFirst,
    /// `{index}_{slide}_{level}`, used by random mode
    IndexFirst,
}

/// Builds tile filenames for one naming context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileNamer {
    scheme: NamingScheme,
    width: usize,
    extension: &'static str,
}

impl TileNamer {
    /// Namer padding indices for `expected` tiles.
    pub fn new(scheme: NamingScheme, expected: u64, extension: &'static str) -> Self {
        Self {
            scheme,
            width: index_width(expected),
            extension,
        }
    }

    pub fn name(&self, index: u64, slide_id: &str, level: usize) -> String {
        let width = self.width;
        match self.scheme {
            NamingScheme::SlideFirst => format!(
                "{}_{:0width$}_{}.{}",
                slide_id, index, level, self.extension
            ),
            NamingScheme::IndexFirst => format!(
                "{:0width$}_{}_{}.{}",
                index, slide_id, level, self.extension
            ),
        }
    }
}

// =============================================================================
// Output Writer
// =============================================================================

/// Persists accepted tiles into a flat destination folder.
///
/// Refuses to write the same filename twice during its lifetime.
pub struct OutputWriter {
    destination: PathBuf,
    encoder: TileEncoder,
    written: HashSet<String>,
}

impl OutputWriter {
    /// Prepare the destination folder, creating it if missing.
    ///
    /// # Errors
    /// `WriteError::Destination` if the path exists but is not a folder, or
    /// cannot be created.
    pub fn new(destination: impl Into<PathBuf>, encoder: TileEncoder) -> Result<Self, WriteError> {
        let destination = destination.into();

        if destination.exists() && !destination.is_dir() {
            return Err(WriteError::Destination {
                path: destination,
                message: "not a directory".to_string(),
            });
        }
        fs::create_dir_all(&destination).map_err(|e| WriteError::Destination {
            path: destination.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            destination,
            encoder,
            written: HashSet::new(),
        })
    }

    /// Extension matching the encoder's output format.
    pub fn extension(&self) -> &'static str {
        self.encoder.format().extension()
    }

    /// Number of tiles written so far.
    pub fn written(&self) -> usize {
        self.written.len()
    }

    /// Encode `tile` and write it as `name` inside the destination.
    pub fn write(&mut self, name: &str, tile: &RgbaImage) -> Result<PathBuf, WriteError> {
        if self.written.contains(name) {
            return Err(WriteError::DuplicateName(name.to_string()));
        }

        let bytes = self.encoder.encode(tile).map_err(|e| WriteError::Encode {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        let path = self.destination.join(name);
        fs::write(&path, &bytes).map_err(|e| WriteError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        debug!(file = %path.display(), bytes = bytes.len(), "Wrote tile");
        self.written.insert(name.to_string());
        Ok(path)
    }
}

// =============================================================================
// Tests
// =============================================================================
