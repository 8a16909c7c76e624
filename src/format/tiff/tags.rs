//! TIFF tag and field type definitions.
//!
//! Only the vocabulary needed to locate pyramid tiles is defined here;
//! unknown tags and field types are carried through as raw numbers.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer (1 byte)
    Byte = 1,

    /// 8-bit ASCII character (1 byte)
    Ascii = 2,

    /// Unsigned 16-bit integer (2 bytes)
    Short = 3,

    /// Unsigned 32-bit integer (4 bytes)
    Long = 4,

    /// Undefined byte data (1 byte per element)
    Undefined = 7,

    /// Unsigned 64-bit integer (8 bytes) - BigTIFF only
    Long8 = 16,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::Undefined => 1,
            FieldType::Short => 2,
            FieldType::Long => 4,
            FieldType::Long8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            7 => Some(FieldType::Undefined),
            16 => Some(FieldType::Long8),
            _ => None,
        }
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs relevant to reading pyramid tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    ImageWidth = 256,
    ImageLength = 257,
    Compression = 259,
    PhotometricInterpretation = 262,
    SamplesPerPixel = 277,
    PlanarConfiguration = 284,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,

    /// JPEG quantization and Huffman tables shared by abbreviated tile streams
    JpegTables = 347,
}

impl TiffTag {
    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Human-readable tag name for error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::Compression => "Compression",
            TiffTag::PhotometricInterpretation => "PhotometricInterpretation",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::PlanarConfiguration => "PlanarConfiguration",
            TiffTag::TileWidth => "TileWidth",
            TiffTag::TileLength => "TileLength",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::TileByteCounts => "TileByteCounts",
            TiffTag::JpegTables => "JPEGTables",
        }
    }
}

// =============================================================================
// Compression Values
// =============================================================================

/// Tile compression schemes the reader can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Raw 8-bit chunky samples
    None,

    /// JPEG ("new-style", TIFF compression 7)
    Jpeg,
}

impl Compression {
    /// Map a TIFF Compression tag value, returning `None` for unsupported schemes.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            7 => Some(Compression::Jpeg),
            _ => None,
        }
    }
}
