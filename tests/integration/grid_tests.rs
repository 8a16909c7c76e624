//! Grid tiling tests.

use std::fs;

use image::Rgba;
use tempfile::TempDir;

use wsi_tiler::error::{ConfigError, CropError};
use wsi_tiler::generator::{run_with, CropOptions, Method};
use wsi_tiler::slide::SlideRegistry;
use wsi_tiler::tile::DominantColorClassifier;

use super::test_utils::{list_files, MockSlide, GLASS, TISSUE};

fn grid_options(destination: &std::path::Path, level: usize, tile: u32, overlap: f64) -> CropOptions {
    let mut options = CropOptions::new(destination);
    options.method = Method::Grid;
    options.level = level;
    options.tile_size = (tile, tile);
    options.overlap = overlap;
    options
}

#[test]
fn test_half_overlap_covers_level() {
    let dir = TempDir::new().unwrap();
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 4096, 4096, 3)]);
    let options = grid_options(&dir.path().join("out"), 2, 256, 0.5);

    let report = run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

    assert_eq!(report.attempts, 49);
    assert_eq!(report.tiles_written, 49);

    let reads = registry.slides()[0].reads();
    assert_eq!(reads.len(), 49);
    for (x, y, level) in &reads {
        assert_eq!(*level, 2);
        assert_eq!(x % 512, 0);
        assert_eq!(y % 512, 0);
        assert!(x / 4 <= 768 && y / 4 <= 768, "({}, {}) out of range", x, y);
    }

    // Column-major: the second read moves down, not right
    assert_eq!(reads[0], (0, 0, 2));
    assert_eq!(reads[1], (0, 512, 2));
    assert_eq!(reads[7], (512, 0, 2));
    assert_eq!(reads[48], (3072, 3072, 2));
}

#[test]
fn test_names_are_slide_first_and_padded() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("m", 30, 20, 1)]);
    let options = grid_options(&destination, 0, 10, 0.0);

    let report = run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

    // 3 columns x 2 rows: fewer than ten cells, so no padding
    assert_eq!(report.tiles_written, 6);
    let expected: Vec<String> = (0..6).map(|i| format!("m_{}_0.png", i)).collect();
    assert_eq!(list_files(&destination), expected);
}

#[test]
fn test_acceptance_order_follows_columns() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    // Only the top row is tissue
    let slide = MockSlide::new("m", 30, 20, 1).with_painter(|_, _, y| {
        let c = if y < 10 { TISSUE } else { GLASS };
        Rgba([c[0], c[1], c[2], 255])
    });
    let registry = SlideRegistry::from_slides(vec![slide]);
    let options = grid_options(&destination, 0, 10, 0.0);

    let report = run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

    assert_eq!(report.attempts, 6);
    assert_eq!(report.tiles_written, 3);
    assert_eq!(report.per_slide[0].candidates, 6);
    assert_eq!(report.per_slide[0].written, 3);
    assert_eq!(list_files(&destination), vec!["m_0_0.png", "m_1_0.png", "m_2_0.png"]);
}

#[test]
fn test_indices_restart_per_slide() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![
        MockSlide::new("a", 20, 10, 1),
        MockSlide::new("b", 30, 10, 1),
    ]);
    let options = grid_options(&destination, 0, 10, 0.0);

    let report = run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

    assert_eq!(report.slides, 2);
    assert_eq!(report.tiles_written, 5);
    assert_eq!(
        list_files(&destination),
        vec!["a_0_0.png", "a_1_0.png", "b_0_0.png", "b_1_0.png", "b_2_0.png"]
    );
}

#[test]
fn test_runs_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let painter = |_: usize, x: u32, y: u32| {
        let c = if (x / 16 + y / 16) % 2 == 0 { TISSUE } else { GLASS };
        Rgba([c[0], c[1], c[2], 255])
    };

    let mut outputs = Vec::new();
    for run in ["first", "second"] {
        let destination = dir.path().join(run);
        let registry =
            SlideRegistry::from_slides(vec![MockSlide::new("s", 128, 96, 2).with_painter(painter)]);
        let options = grid_options(&destination, 1, 16, 0.25);
        run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

        let files = list_files(&destination);
        let contents: Vec<Vec<u8>> = files
            .iter()
            .map(|f| fs::read(destination.join(f)).unwrap())
            .collect();
        outputs.push((files, contents));
    }

    assert!(!outputs[0].0.is_empty());
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_background_slide_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("g", 64, 64, 1).gray()]);
    let options = grid_options(&destination, 0, 16, 0.0);

    let report = run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

    assert_eq!(report.attempts, 16);
    assert_eq!(report.tiles_written, 0);
    assert!(destination.is_dir());
    assert!(list_files(&destination).is_empty());
}

#[test]
fn test_tile_equal_to_level_is_one_cell() {
    let dir = TempDir::new().unwrap();
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 64, 64, 2)]);
    let options = grid_options(&dir.path().join("out"), 1, 32, 0.5);

    let report = run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();
    assert_eq!(report.attempts, 1);
    assert_eq!(report.tiles_written, 1);
}

#[test]
fn test_tile_larger_than_any_slide_fails_before_writing() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![
        MockSlide::new("big", 1024, 1024, 1),
        MockSlide::new("small", 100, 100, 1),
    ]);
    let options = grid_options(&destination, 0, 128, 0.0);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());

    match result {
        Err(CropError::Config(ConfigError::TileExceedsSlide { slide, .. })) => {
            assert_eq!(slide, "small")
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.tiles_written)),
    }
    assert!(!destination.exists());
    assert!(registry.slides()[0].reads().is_empty());
}

#[test]
fn test_missing_level_fails_before_writing() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 1024, 1024, 2)]);
    let options = grid_options(&destination, 4, 16, 0.0);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());
    assert!(matches!(
        result,
        Err(CropError::Config(ConfigError::LevelOutOfRange {
            level: 4,
            level_count: 2,
            ..
        }))
    ));
    assert!(!destination.exists());
}

#[test]
fn test_zero_stride_rejected() {
    let dir = TempDir::new().unwrap();
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 64, 64, 1)]);
    let options = grid_options(&dir.path().join("out"), 0, 1, 0.5);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());
    assert!(matches!(
        result,
        Err(CropError::Config(ConfigError::ZeroStride { .. }))
    ));
}

#[test]
fn test_read_failure_aborts() {
    let dir = TempDir::new().unwrap();
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("broken", 64, 64, 1).failing()]);
    let options = grid_options(&dir.path().join("out"), 0, 32, 0.0);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());
    match result {
        Err(CropError::Read {
            slide,
            location,
            level,
            ..
        }) => {
            assert_eq!(slide, "broken");
            assert_eq!(location, (0, 0));
            assert_eq!(level, 0);
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.tiles_written)),
    }
}

#[test]
fn test_custom_classifier_closure() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 40, 40, 1).gray()]);
    let options = grid_options(&destination, 0, 20, 0.0);

    // Accept everything, background included
    let accept_all = |_: &image::RgbaImage| true;
    let report = run_with(&registry, &options, &accept_all).unwrap();

    assert_eq!(report.tiles_written, 4);
    assert_eq!(list_files(&destination).len(), 4);
}
