//! Slide abstraction layer.
//!
//! The tile generators work against the [`Slide`] trait only; this module
//! provides the trait, the pyramidal TIFF implementation, and the registry
//! that discovers and opens slides for a run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Grid / Random generators        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SlideRegistry                │
//! │   (discovers, deduplicates, opens)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Slide Trait                │
//! │  (level dimensions + region reads)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TiffSlide                  │
//! │   (SVS / pyramidal TIFF, tile cache)    │
//! └─────────────────────────────────────────┘
//! ```

mod reader;
mod registry;
mod tiff_slide;

pub use reader::{LevelInfo, Slide};
pub use registry::{assign_ids, discover, SlideOpener, SlideRegistry, TiffOpener};
pub use tiff_slide::{TiffSlide, DEFAULT_TILE_CACHE_CAPACITY};
