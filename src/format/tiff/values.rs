//! TIFF tag value reading.
//!
//! Small values live inline in the IFD entry; arrays such as TileOffsets are
//! stored elsewhere in the file and fetched with a single range read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{IfdEntry, TiffHeader};
use super::tags::FieldType;

/// Reads tag values from a TIFF file, respecting its byte order.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    /// Create a new ValueReader.
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Read raw bytes for an IFD entry's value.
    pub fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::InvalidTagValue {
                tag: "unknown",
                message: format!("unsupported field type {}", entry.field_type_raw),
            })?;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ));
        }

        let len = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
            tag: "unknown",
            message: format!("value of {} bytes is too large", size),
        })?;
        Ok(self.reader.read_exact_at(entry.value_offset, len)?)
    }

    /// Read an array of integers (Short, Long, or Long8) widened to u64.
    ///
    /// This is the primary method for reading TileOffsets and TileByteCounts.
    pub fn read_u64_array(
        &self,
        entry: &IfdEntry,
        tag: &'static str,
    ) -> Result<Vec<u64>, TiffError> {
        let field_type = entry.field_type.ok_or_else(|| TiffError::InvalidTagValue {
            tag,
            message: format!("unsupported field type {}", entry.field_type_raw),
        })?;

        let width = match field_type {
            FieldType::Short | FieldType::Long | FieldType::Long8 => field_type.size_in_bytes(),
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag,
                    message: format!("expected Short, Long, or Long8 array, got {:?}", other),
                })
            }
        };

        let bytes = self.read_bytes(entry)?;
        let byte_order = self.header.byte_order;

        Ok(bytes
            .chunks_exact(width)
            .map(|chunk| match field_type {
                FieldType::Short => byte_order.read_u16(chunk) as u64,
                FieldType::Long => byte_order.read_u32(chunk) as u64,
                _ => byte_order.read_u64(chunk),
            })
            .collect())
    }
}
