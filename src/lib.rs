//! # WSI Tiler
//!
//! Extracts tissue tiles from pyramidal Whole Slide Images (WSI) to build
//! machine-learning datasets.
//!
//! Slides are read directly from their tiled TIFF structure: only the
//! headers, tile tables and the tiles a region touches are loaded, so
//! gigapixel files never sit in memory whole.
//!
//! ## Features
//!
//! - **Two strategies**: exhaustive grid with overlap, or random rejection sampling across slides
//! - **Background rejection**: tiles dominated by gray glass or transparent padding are dropped
//! - **Format support**: native parsers for Aperio SVS and pyramidal TIFF (raw and JPEG tiles)
//! - **Ordered output**: zero-padded indices make filenames sort in acceptance order
//!
//! ## Architecture
//!
//! - [`io`] - Positioned reads over local files
//! - [`mod@format`] - TIFF pyramid parsing and JPEG tile decoding
//! - [`slide`] - Slide trait, TIFF slide reader and slide registry
//! - [`tile`] - Tile requests, classifier, naming, encoding and writing
//! - [`generator`] - Grid and random generators and the [`run`] entry point
//! - [`config`] - CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_tiler::{run, CropOptions, Method};
//!
//! let mut options = CropOptions::new("tiles");
//! options.method = Method::Grid;
//! options.level = 1;
//! options.overlap = 0.25;
//!
//! let report = run(&["/data/slides"], "svs", &options).expect("tiling failed");
//! println!("{} tiles written", report.tiles_written);
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod generator;
pub mod io;
pub mod slide;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, CropConfig, InspectConfig};
pub use error::{ConfigError, CropError, IoError, OpenError, SlideError, TiffError, WriteError};
pub use generator::{run, run_with, CropOptions, GridPlan, Method, RunReport, SlideReport};
pub use io::{FileRangeReader, RangeReader};
pub use slide::{LevelInfo, Slide, SlideOpener, SlideRegistry, TiffOpener, TiffSlide};
pub use tile::{
    DominantColorClassifier, OutputFormat, OutputWriter, TileClassifier, TileEncoder, TileNamer,
    TileRequest,
};
