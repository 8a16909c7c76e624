//! TIFF parser for Whole Slide Images.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. The parser handles both transparently.
//!
//! - **IFD (Image File Directory)**: Contains metadata and pointers to image data.
//!   WSI files typically have multiple IFDs for pyramid levels, labels, and macros.

mod parser;
mod pyramid;
mod tags;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{PyramidLevel, TiffPyramid, TileData};
pub use tags::{Compression, FieldType, TiffTag};
pub use values::ValueReader;
