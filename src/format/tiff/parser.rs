//! TIFF header and IFD parsing.
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order
//! Bytes 2-3: Version (43 = 0x002B)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```

use crate::error::TiffError;

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

const VERSION_TIFF: u16 = 42;
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Upper bound on entries in one IFD; real slides carry a few dozen.
const MAX_IFD_ENTRIES: u64 = 4096;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the first 2 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 2 bytes.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Read a u32 from the first 4 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 4 bytes.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Read a u64 from the first 8 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 8 bytes.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// # Errors
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    /// - `InvalidBigTiffOffsetSize` if BigTIFF offset size is not 8
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidIfdOffset` if the first IFD offset is outside the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // Byte order marker is a byte pattern, so read it in a fixed order
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }

                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }

                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Size of an IFD entry: 12 bytes classic, 20 bytes BigTIFF.
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the value/offset field (and of the next-IFD pointer).
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// IFD Entries
// =============================================================================

/// A single tag entry from an IFD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Numeric tag ID
    pub tag: u16,

    /// Decoded field type, `None` for types we don't understand
    pub field_type: Option<FieldType>,

    /// Raw field type value as stored in the file
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// Raw value/offset field (4 meaningful bytes in classic TIFF)
    pub value_offset_bytes: [u8; 8],

    /// Whether the value fits in the value/offset field
    pub is_inline: bool,

    /// File offset of the value when it is not inline
    pub value_offset: u64,
}

impl IfdEntry {
    /// Total size of the value in bytes, if the field type is known.
    pub fn value_byte_size(&self) -> Option<u64> {
        let field_type = self.field_type?;
        (field_type.size_in_bytes() as u64).checked_mul(self.count)
    }

    /// Read a single inline integer value (Short, Long, or Long8).
    pub fn inline_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        if !self.is_inline || self.count != 1 {
            return None;
        }
        match self.field_type? {
            FieldType::Short => Some(byte_order.read_u16(&self.value_offset_bytes) as u64),
            FieldType::Long => Some(byte_order.read_u32(&self.value_offset_bytes) as u64),
            FieldType::Long8 => Some(byte_order.read_u64(&self.value_offset_bytes)),
            _ => None,
        }
    }
}

/// A parsed Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// Entries in file order
    pub entries: Vec<IfdEntry>,

    /// Offset of the next IFD, 0 at the end of the chain
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Total size in bytes of an IFD with `entry_count` entries.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> usize {
        header.ifd_count_size()
            + entry_count as usize * header.ifd_entry_size()
            + header.value_offset_size()
    }

    /// Decode the entry count from the leading bytes of an IFD.
    pub fn entry_count(bytes: &[u8], header: &TiffHeader) -> Result<u64, TiffError> {
        let count = if header.is_bigtiff {
            header.byte_order.read_u64(bytes)
        } else {
            header.byte_order.read_u16(bytes) as u64
        };

        if count > MAX_IFD_ENTRIES {
            return Err(TiffError::InvalidTagValue {
                tag: "IFD",
                message: format!("{} entries exceeds limit of {}", count, MAX_IFD_ENTRIES),
            });
        }
        Ok(count)
    }

    /// Parse an IFD from bytes that start at the IFD offset.
    ///
    /// `bytes` must cover `calculate_size(entry_count)` bytes.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let byte_order = header.byte_order;
        let entry_count = Self::entry_count(bytes, header)?;
        let expected = Self::calculate_size(entry_count, header);
        if bytes.len() < expected {
            return Err(TiffError::FileTooSmall {
                required: expected as u64,
                actual: bytes.len() as u64,
            });
        }

        let value_size = header.value_offset_size();
        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut pos = header.ifd_count_size();

        for _ in 0..entry_count {
            let raw = &bytes[pos..pos + header.ifd_entry_size()];
            let tag = byte_order.read_u16(&raw[0..2]);
            let field_type_raw = byte_order.read_u16(&raw[2..4]);
            let (count, value_start) = if header.is_bigtiff {
                (byte_order.read_u64(&raw[4..12]), 12)
            } else {
                (byte_order.read_u32(&raw[4..8]) as u64, 8)
            };

            let mut value_offset_bytes = [0u8; 8];
            value_offset_bytes[..value_size]
                .copy_from_slice(&raw[value_start..value_start + value_size]);

            let field_type = FieldType::from_u16(field_type_raw);
            let is_inline = field_type
                .and_then(|t| (t.size_in_bytes() as u64).checked_mul(count))
                .is_some_and(|size| size <= value_size as u64);
            let value_offset = if header.is_bigtiff {
                byte_order.read_u64(&value_offset_bytes)
            } else {
                byte_order.read_u32(&value_offset_bytes) as u64
            };

            entries.push(IfdEntry {
                tag,
                field_type,
                field_type_raw,
                count,
                value_offset_bytes,
                is_inline,
                value_offset,
            });
            pos += header.ifd_entry_size();
        }

        let next_ifd_offset = if header.is_bigtiff {
            byte_order.read_u64(&bytes[pos..pos + 8])
        } else {
            byte_order.read_u32(&bytes[pos..pos + 4]) as u64
        };

        Ok(Ifd {
            entries,
            next_ifd_offset,
        })
    }

    /// Find an entry by tag.
    pub fn get(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag.as_u16())
    }

    /// Read a single inline integer tag.
    pub fn get_u64(&self, tag: TiffTag, byte_order: ByteOrder) -> Option<u64> {
        self.get(tag)?.inline_u64(byte_order)
    }

    /// Read a single inline integer tag that must fit in a u32.
    pub fn get_u32(&self, tag: TiffTag, byte_order: ByteOrder) -> Option<u32> {
        self.get_u64(tag, byte_order)
            .and_then(|v| u32::try_from(v).ok())
    }
}

// =============================================================================
// Tests
// =============================================================================
