use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a slide file.
///
/// The TIFF parser only ever asks for the bytes it needs (headers, IFDs,
/// tile payloads), so gigapixel files are never loaded whole.
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging).
    fn identifier(&self) -> &str;
}

/// Validate that `[offset, offset + len)` lies inside a resource of `size` bytes.
pub(crate) fn check_range(offset: u64, len: usize, size: u64) -> Result<(), IoError> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size,
        }),
    }
}

// =============================================================================
// Local File Reader
// =============================================================================

/// Range reader over a local file.
///
/// Reads go through a seek + read pair under a mutex, so a single handle can
/// be shared by reference.
pub struct FileRangeReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open a file and record its size.
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let identifier = path.display().to_string();
        let file = File::open(path).map_err(|e| map_io_error(&identifier, e))?;
        let size = file
            .metadata()
            .map_err(|e| map_io_error(&identifier, e))?
            .len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier,
        })
    }
}

impl RangeReader for FileRangeReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = vec![0u8; len];
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| map_io_error(&self.identifier, e))?;
        file.read_exact(&mut buf)
            .map_err(|e| map_io_error(&self.identifier, e))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

fn map_io_error(path: &str, err: std::io::Error) -> IoError {
    match err.kind() {
        ErrorKind::NotFound => IoError::NotFound(path.to_string()),
        _ => IoError::Read {
            path: path.to_string(),
            message: err.to_string(),
        },
    }
}

// =============================================================================
// In-memory Reader
// =============================================================================

impl RangeReader for Bytes {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.len() as u64)?;
        let start = offset as usize;
        Ok(self.slice(start..start + len))
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn identifier(&self) -> &str {
        "memory"
    }
}
