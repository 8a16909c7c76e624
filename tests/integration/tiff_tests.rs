//! Pyramidal TIFF reading tests.

use bytes::Bytes;
use image::{Rgb, RgbImage, Rgba};
use tempfile::TempDir;

use wsi_tiler::error::{SlideError, TiffError};
use wsi_tiler::generator::GridPlan;
use wsi_tiler::slide::{Slide, TiffSlide};

use super::test_utils::{
    gradient_image, write_slide, ByteOrderType, TiffBuilder, TileEncoding, TISSUE,
};

fn open(data: Vec<u8>) -> Result<TiffSlide<Bytes>, TiffError> {
    TiffSlide::open(Bytes::from(data), "test", 8)
}

fn rgba(pixel: Rgb<u8>) -> Rgba<u8> {
    Rgba([pixel[0], pixel[1], pixel[2], 255])
}

fn close(a: Rgba<u8>, b: Rgb<u8>, tolerance: i32) -> bool {
    (0..3).all(|c| (a[c] as i32 - b[c] as i32).abs() <= tolerance) && a[3] == 255
}

// =============================================================================
// Structure
// =============================================================================

#[test]
fn test_raw_pyramid_levels() {
    let image = gradient_image(300, 200);
    let slide = open(TiffBuilder::new().add_pyramid(&image, 3, 64, TileEncoding::Raw).build()).unwrap();

    assert_eq!(slide.id(), "test");
    assert_eq!(slide.level_count(), 3);
    assert_eq!(slide.level_dimensions(0), Some((300, 200)));
    assert_eq!(slide.level_dimensions(1), Some((150, 100)));
    assert_eq!(slide.level_dimensions(2), Some((75, 50)));
    assert_eq!(slide.level_dimensions(3), None);
    assert_eq!(slide.level_downsample(0), Some(1.0));
    assert_eq!(slide.level_downsample(1), Some(2.0));
    assert_eq!(slide.level_downsample(2), Some(4.0));
}

#[test]
fn test_levels_sorted_by_size() {
    // Smallest level written first
    let image = gradient_image(256, 256);
    let small = RgbImage::from_fn(128, 128, |x, y| *image.get_pixel(x * 2, y * 2));
    let data = TiffBuilder::new()
        .add_level(&small, 64, TileEncoding::Raw)
        .add_level(&image, 64, TileEncoding::Raw)
        .build();

    let slide = open(data).unwrap();
    assert_eq!(slide.level_dimensions(0), Some((256, 256)));
    assert_eq!(slide.level_dimensions(1), Some((128, 128)));
}

// =============================================================================
// Region Reads
// =============================================================================

#[test]
fn test_full_level_read_matches_source() {
    let image = gradient_image(300, 200);
    let slide = open(TiffBuilder::new().add_level(&image, 64, TileEncoding::Raw).build()).unwrap();

    let region = slide.read_region((0, 0), 0, (300, 200)).unwrap();
    assert_eq!(region.dimensions(), (300, 200));
    for (x, y, pixel) in region.enumerate_pixels() {
        assert_eq!(*pixel, rgba(*image.get_pixel(x, y)), "pixel ({}, {})", x, y);
    }
}

#[test]
fn test_region_across_tile_boundaries() {
    let image = gradient_image(300, 200);
    let slide = open(TiffBuilder::new().add_level(&image, 64, TileEncoding::Raw).build()).unwrap();

    let region = slide.read_region((60, 60), 0, (10, 10)).unwrap();
    assert_eq!(region.dimensions(), (10, 10));
    assert_eq!(*region.get_pixel(0, 0), rgba(*image.get_pixel(60, 60)));
    assert_eq!(*region.get_pixel(4, 4), rgba(*image.get_pixel(64, 64)));
    assert_eq!(*region.get_pixel(9, 3), rgba(*image.get_pixel(69, 63)));
}

#[test]
fn test_region_outside_level_is_transparent() {
    let image = gradient_image(300, 200);
    let slide = open(TiffBuilder::new().add_level(&image, 64, TileEncoding::Raw).build()).unwrap();

    let region = slide.read_region((290, 190), 0, (20, 20)).unwrap();
    assert_eq!(region.dimensions(), (20, 20));
    assert_eq!(*region.get_pixel(5, 5), rgba(*image.get_pixel(295, 195)));
    // Past the image edge, inside the zero-padded edge tile
    assert_eq!(*region.get_pixel(15, 15), Rgba([0, 0, 0, 0]));
    assert_eq!(*region.get_pixel(5, 15), Rgba([0, 0, 0, 0]));

    let far = slide.read_region((5000, 5000), 0, (8, 8)).unwrap();
    assert!(far.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
}

#[test]
fn test_lower_level_uses_level0_location() {
    let image = gradient_image(300, 200);
    let slide = open(TiffBuilder::new().add_pyramid(&image, 2, 64, TileEncoding::Raw).build()).unwrap();

    // Level-0 (100, 50) is level-1 (50, 25), which samples source (100, 50)
    let region = slide.read_region((100, 50), 1, (4, 4)).unwrap();
    assert_eq!(*region.get_pixel(0, 0), rgba(*image.get_pixel(100, 50)));
    assert_eq!(*region.get_pixel(1, 0), rgba(*image.get_pixel(102, 50)));
}

#[test]
fn test_odd_sized_pyramid_reads_planned_cells() {
    // 101 -> 50 gives a measured downsample of 2.02
    let image = gradient_image(101, 101);
    let slide = open(TiffBuilder::new().add_pyramid(&image, 2, 16, TileEncoding::Raw).build()).unwrap();
    assert_eq!(slide.level_dimensions(1), Some((50, 50)));
    let downsample = slide.level_downsample(1).unwrap();
    assert!(downsample > 2.0);

    let plan = GridPlan::for_slide(&slide, 1, (2, 2), 0.0).unwrap();
    assert_eq!((plan.columns, plan.rows), (25, 25));
    for (i, j) in plan.cells() {
        let region = slide.read_region(plan.origin(i, j), 1, (2, 2)).unwrap();
        // Level-1 pixel (x, y) samples source (2x, 2y)
        assert_eq!(
            *region.get_pixel(0, 0),
            rgba(*image.get_pixel(4 * i, 4 * j)),
            "cell ({}, {})",
            i,
            j
        );
    }

    // Every level column survives the level-0 round trip
    for x in 0..50u32 {
        let location = ((x as f64 * downsample).round() as u64, 0);
        let region = slide.read_region(location, 1, (1, 1)).unwrap();
        assert_eq!(*region.get_pixel(0, 0), rgba(*image.get_pixel(2 * x, 0)), "column {}", x);
    }
}

#[test]
fn test_level_out_of_range() {
    let image = gradient_image(64, 64);
    let slide = open(TiffBuilder::new().add_level(&image, 32, TileEncoding::Raw).build()).unwrap();

    let result = slide.read_region((0, 0), 3, (8, 8));
    assert!(matches!(
        result,
        Err(SlideError::LevelOutOfRange {
            level: 3,
            level_count: 1
        })
    ));
}

#[test]
fn test_repeated_reads_are_stable() {
    let image = gradient_image(128, 128);
    let slide = open(TiffBuilder::new().add_level(&image, 32, TileEncoding::Raw).build()).unwrap();

    let first = slide.read_region((10, 20), 0, (50, 50)).unwrap();
    let second = slide.read_region((10, 20), 0, (50, 50)).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Container Variants
// =============================================================================

#[test]
fn test_big_endian_and_bigtiff_match_little_endian() {
    let image = gradient_image(200, 150);
    let reference = open(TiffBuilder::new().add_pyramid(&image, 2, 64, TileEncoding::Raw).build())
        .unwrap()
        .read_region((30, 40), 0, (100, 80))
        .unwrap();

    for (order, bigtiff) in [
        (ByteOrderType::BigEndian, false),
        (ByteOrderType::LittleEndian, true),
        (ByteOrderType::BigEndian, true),
    ] {
        let data = TiffBuilder::new()
            .with_byte_order(order)
            .with_bigtiff(bigtiff)
            .add_pyramid(&image, 2, 64, TileEncoding::Raw)
            .build();
        let slide = open(data).unwrap();
        assert_eq!(slide.level_count(), 2);
        assert_eq!(slide.read_region((30, 40), 0, (100, 80)).unwrap(), reference);
    }
}

#[test]
fn test_jpeg_tiles() {
    let image = RgbImage::from_pixel(128, 128, TISSUE);
    let slide = open(TiffBuilder::new().add_level(&image, 64, TileEncoding::Jpeg).build()).unwrap();

    let region = slide.read_region((32, 32), 0, (64, 64)).unwrap();
    assert!(region.pixels().all(|p| close(*p, TISSUE, 8)));
}

#[test]
fn test_jpeg_tiles_with_shared_tables() {
    let image = RgbImage::from_pixel(128, 128, TISSUE);
    let slide = open(
        TiffBuilder::new()
            .add_level(&image, 64, TileEncoding::JpegWithTables)
            .build(),
    )
    .unwrap();

    let region = slide.read_region((0, 0), 0, (128, 128)).unwrap();
    assert!(region.pixels().all(|p| close(*p, TISSUE, 8)));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_unsupported_compression_rejected_at_open() {
    let image = gradient_image(64, 64);
    let data = TiffBuilder::new()
        .add_level(&image, 32, TileEncoding::Declared(5))
        .build();

    assert!(matches!(open(data), Err(TiffError::UnsupportedCompression(5))));
}

#[test]
fn test_not_a_tiff() {
    let result = open(b"PK\x03\x04 definitely a zip archive".to_vec());
    assert!(matches!(result, Err(TiffError::InvalidMagic(_))));
}

#[test]
fn test_truncated_file() {
    let image = gradient_image(64, 64);
    let mut data = TiffBuilder::new().add_level(&image, 32, TileEncoding::Raw).build();
    data.truncate(data.len() - 40);

    assert!(open(data).is_err());
}

#[test]
fn test_open_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("disk.svs");
    let image = gradient_image(96, 96);
    write_slide(&path, &TiffBuilder::new().add_level(&image, 32, TileEncoding::Raw).build());

    let slide = TiffSlide::open_path(&path, "disk", 4).unwrap();
    assert_eq!(slide.id(), "disk");
    let region = slide.read_region((95, 95), 0, (1, 1)).unwrap();
    assert_eq!(*region.get_pixel(0, 0), rgba(*image.get_pixel(95, 95)));

    let missing = TiffSlide::open_path(&dir.path().join("missing.svs"), "missing", 4);
    assert!(matches!(missing, Err(TiffError::Io(_))));
}
