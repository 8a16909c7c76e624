//! Format parsers for Whole Slide Image files.
//!
//! Tiled TIFF is the container behind Aperio SVS and generic pyramidal
//! TIFF slides; [`tiff`] locates pyramid tiles and [`jpeg`] turns their
//! payloads back into pixels.

pub mod jpeg;
pub mod tiff;

pub use jpeg::{decode_jpeg_tile, is_abbreviated_stream, merge_jpeg_tables, prepare_tile_jpeg};
