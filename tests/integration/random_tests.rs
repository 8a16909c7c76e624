//! Random rejection sampling tests.

use std::fs;

use image::Rgba;
use tempfile::TempDir;

use wsi_tiler::error::{ConfigError, CropError};
use wsi_tiler::generator::{run_with, CropOptions, Method};
use wsi_tiler::slide::SlideRegistry;
use wsi_tiler::tile::DominantColorClassifier;

use super::test_utils::{list_files, MockSlide, GLASS, TISSUE};

fn random_options(destination: &std::path::Path, level: usize, tile: u32, count: u64) -> CropOptions {
    let mut options = CropOptions::new(destination);
    options.method = Method::Random;
    options.level = level;
    options.tile_size = (tile, tile);
    options.count = count;
    options.seed = Some(42);
    options
}

/// Left half tissue, right half glass, at every level.
fn half_tissue_slide(id: &str, width: u32, height: u32, levels: usize) -> MockSlide {
    MockSlide::new(id, width, height, levels).with_painter(move |level, x, _| {
        let c = if x < (width >> level) / 2 { TISSUE } else { GLASS };
        Rgba([c[0], c[1], c[2], 255])
    })
}

#[test]
fn test_writes_exactly_count_tiles() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![
        half_tissue_slide("a", 1024, 512, 2),
        half_tissue_slide("b", 512, 1024, 2),
    ]);
    let options = random_options(&destination, 1, 32, 25);

    let report = run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

    assert_eq!(report.tiles_written, 25);
    assert!(report.attempts >= 25);
    assert_eq!(
        report.per_slide.iter().map(|r| r.written).sum::<u64>(),
        25
    );
    assert_eq!(
        report.per_slide.iter().map(|r| r.candidates).sum::<u64>(),
        report.attempts
    );

    let files = list_files(&destination);
    assert_eq!(files.len(), 25);
    for (index, file) in files.iter().enumerate() {
        let prefix = format!("{:02}_", index);
        assert!(file.starts_with(&prefix), "{} lacks {}", file, prefix);
        assert!(file.ends_with("_1.png"));
        let id = &file[3..file.len() - "_1.png".len()];
        assert!(id == "a" || id == "b", "unexpected slide id in {}", file);
    }
}

#[test]
fn test_reads_stay_inside_level() {
    let dir = TempDir::new().unwrap();
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 400, 300, 3)]);
    let options = random_options(&dir.path().join("out"), 2, 20, 200);

    run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

    // Level 2 is 100x75: corners in [0, 80) x [0, 55) level pixels
    let reads = registry.slides()[0].reads();
    assert_eq!(reads.len(), 200);
    for (x, y, level) in reads {
        assert_eq!(level, 2);
        assert_eq!(x % 4, 0);
        assert_eq!(y % 4, 0);
        assert!(x / 4 < 80, "x {} out of range", x);
        assert!(y / 4 < 55, "y {} out of range", y);
    }
}

#[test]
fn test_background_pool_exhausts_budget() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("g", 256, 256, 1).gray()]);
    let mut options = random_options(&destination, 0, 32, 5);
    options.max_attempts = Some(50);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());

    assert!(matches!(
        result,
        Err(CropError::TargetNotMet {
            accepted: 0,
            target: 5,
            attempts: 50
        })
    ));
    assert_eq!(registry.slides()[0].reads().len(), 50);
    assert!(list_files(&destination).is_empty());
}

#[test]
fn test_empty_pool() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry: SlideRegistry<MockSlide> = SlideRegistry::from_slides(Vec::new());
    let options = random_options(&destination, 0, 32, 5);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());

    assert!(matches!(result, Err(CropError::Config(ConfigError::EmptyPool))));
    assert!(!destination.exists());
}

#[test]
fn test_tile_equal_to_level_rejected() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![
        MockSlide::new("wide", 512, 512, 1),
        MockSlide::new("exact", 64, 128, 1),
    ]);
    let options = random_options(&destination, 0, 64, 5);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());

    match result {
        Err(CropError::Config(ConfigError::TileExceedsSlide { slide, width, .. })) => {
            assert_eq!(slide, "exact");
            assert_eq!(width, 64);
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.tiles_written)),
    }
    assert!(!destination.exists());
}

#[test]
fn test_zero_count_rejected() {
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("out");
    let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 512, 512, 1)]);
    let options = random_options(&destination, 0, 64, 0);

    let result = run_with(&registry, &options, &DominantColorClassifier::default());

    assert!(matches!(result, Err(CropError::Config(ConfigError::InvalidCount))));
    assert!(!destination.exists());
}

#[test]
fn test_same_seed_same_dataset() {
    let dir = TempDir::new().unwrap();
    let gradient = |_: usize, x: u32, y: u32| Rgba([(x % 256) as u8, (y % 256) as u8, 17, 255]);

    let mut outputs = Vec::new();
    for run in ["first", "second"] {
        let destination = dir.path().join(run);
        let registry = SlideRegistry::from_slides(vec![
            MockSlide::new("a", 600, 400, 1).with_painter(gradient),
            MockSlide::new("b", 400, 600, 1).with_painter(gradient),
        ]);
        let options = random_options(&destination, 0, 16, 30);
        run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();

        let files = list_files(&destination);
        let contents: Vec<Vec<u8>> = files
            .iter()
            .map(|f| fs::read(destination.join(f)).unwrap())
            .collect();
        outputs.push((files, contents));
    }

    assert_eq!(outputs[0].0.len(), 30);
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_different_seeds_differ() {
    let dir = TempDir::new().unwrap();

    let mut reads = Vec::new();
    for seed in [1, 2] {
        let registry = SlideRegistry::from_slides(vec![MockSlide::new("s", 2048, 2048, 1)]);
        let mut options = random_options(&dir.path().join(format!("out{}", seed)), 0, 32, 10);
        options.seed = Some(seed);
        run_with(&registry, &options, &DominantColorClassifier::default()).unwrap();
        reads.push(registry.slides()[0].reads());
    }

    assert_ne!(reads[0], reads[1]);
}
