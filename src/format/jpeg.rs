//! JPEG tile handling.
//!
//! SVS files store "abbreviated" JPEG streams: each tile lacks the
//! quantization (DQT) and Huffman (DHT) tables, which live once in the
//! TIFF `JPEGTables` tag. Before decoding, the tables are spliced in:
//!
//! ```text
//! tables:  SOI DQT DHT ... EOI
//! tile:    SOI SOF SOS <scan> EOI
//! merged:  SOI DQT DHT ... SOF SOS <scan> EOI
//! ```

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::{ImageFormat, ImageReader, RgbaImage};

use crate::error::TiffError;

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
pub const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
pub const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
pub const SOS: [u8; 2] = [0xFF, 0xDA];

/// Check if JPEG data is an abbreviated stream (missing tables).
///
/// An abbreviated stream reaches SOS without any DQT or DHT segment.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            return true;
        }

        // Skip marker segment (marker + 2-byte length + payload)
        if pos + 3 < data.len() && !matches!(marker[1], 0x00 | 0x01 | 0xD0..=0xD9 | 0xFF) {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Merge JPEGTables with abbreviated tile data.
///
/// Strips EOI from the tables and SOI from the tile, then concatenates.
pub fn merge_jpeg_tables(tables: &[u8], tile_data: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile_data);
    }
    if tile_data.is_empty() {
        return Bytes::new();
    }

    let tables_end = if tables.len() >= 2 && tables[tables.len() - 2..] == EOI {
        tables.len() - 2
    } else {
        tables.len()
    };
    let tile_start = if tile_data.len() >= 2 && tile_data[0..2] == SOI {
        2
    } else {
        0
    };

    let mut result = BytesMut::with_capacity(tables_end + tile_data.len() - tile_start);
    result.extend_from_slice(&tables[..tables_end]);
    result.extend_from_slice(&tile_data[tile_start..]);
    result.freeze()
}

/// Prepare tile data for decoding, merging tables only when the tile needs them.
pub fn prepare_tile_jpeg(tables: Option<&[u8]>, tile_data: &[u8]) -> Bytes {
    match tables {
        Some(tables) if is_abbreviated_stream(tile_data) => merge_jpeg_tables(tables, tile_data),
        _ => Bytes::copy_from_slice(tile_data),
    }
}

/// Decode a JPEG tile to RGBA pixels.
pub fn decode_jpeg_tile(tables: Option<&[u8]>, tile_data: &[u8]) -> Result<RgbaImage, TiffError> {
    let jpeg = prepare_tile_jpeg(tables, tile_data);
    let reader = ImageReader::with_format(Cursor::new(jpeg.as_ref()), ImageFormat::Jpeg);
    let img = reader
        .decode()
        .map_err(|e| TiffError::Decode(e.to_string()))?;
    Ok(img.to_rgba8())
}

// =============================================================================
// Tests
// =============================================================================
