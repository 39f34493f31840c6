//! End-to-end properties of the edge detection pipeline.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use ced_pipeline::{
    CannyConfig, ExecutionStrategy, GrayImage, MAX_BRIGHTNESS, PipelineError, detect_edges,
    detect_edges_staged,
};
use image::Luma;

/// Deterministic noise with a few bright blobs, so every stage has work.
fn textured(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 56) as u8
    };
    GrayImage::from_fn(width, height, |x, y| {
        let noise = next() / 4;
        let blob = if (x / 8 + y / 6) % 3 == 0 { 180 } else { 0 };
        Luma([noise.saturating_add(blob)])
    })
}

fn edge_set(edges: &GrayImage) -> Vec<(u32, u32)> {
    edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] == MAX_BRIGHTNESS)
        .map(|(x, y, _)| (x, y))
        .collect()
}

fn with_thresholds(high: u16, low: u16) -> CannyConfig {
    CannyConfig {
        high_threshold: high,
        low_threshold: low,
        ..CannyConfig::default()
    }
}

#[test]
fn zero_image_gives_zero_mask() {
    let edges = detect_edges(&GrayImage::new(8, 8), &CannyConfig::default()).unwrap();
    assert!(edges.pixels().all(|p| p.0[0] == 0));
}

#[test]
fn single_bright_column() {
    let img = GrayImage::from_fn(16, 16, |x, _| Luma([if x == 8 { 255 } else { 0 }]));
    let edges = detect_edges(&img, &CannyConfig::default()).unwrap();

    let mut expected = Vec::new();
    for y in 2..=13 {
        expected.push((7, y));
        expected.push((9, y));
    }
    expected.sort_by_key(|&(x, y)| (y, x));
    assert_eq!(edge_set(&edges), expected);
}

#[test]
fn mask_is_binary_and_same_shape() {
    let img = textured(45, 33, 7);
    let edges = detect_edges(&img, &CannyConfig::default()).unwrap();
    assert_eq!(edges.dimensions(), img.dimensions());
    assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == MAX_BRIGHTNESS));
}

#[test]
fn lower_thresholds_only_add_edges() {
    let img = textured(64, 48, 42);
    let strict = edge_set(&detect_edges(&img, &with_thresholds(200, 120)).unwrap());
    assert!(!strict.is_empty(), "test image should produce edges");

    for (high, low) in [(200, 60), (150, 120), (105, 45), (40, 0)] {
        let loose = edge_set(&detect_edges(&img, &with_thresholds(high, low)).unwrap());
        for pixel in &strict {
            assert!(
                loose.binary_search_by_key(&(pixel.1, pixel.0), |&(x, y)| (y, x)).is_ok(),
                "{pixel:?} lost at thresholds {high}/{low}",
            );
        }
    }
}

#[test]
fn strong_suppressed_pixels_are_always_edges() {
    let stages = detect_edges_staged(&textured(50, 40, 3), &CannyConfig::default()).unwrap();
    let high = f32::from(CannyConfig::DEFAULT_HIGH_THRESHOLD);
    let low = f32::from(CannyConfig::DEFAULT_LOW_THRESHOLD);
    for (x, y, p) in stages.suppressed.enumerate_pixels() {
        let edge = stages.edges.get_pixel(x, y).0[0] == MAX_BRIGHTNESS;
        let interior = x > 0 && y > 0 && x < 49 && y < 39;
        if interior && p.0[0] >= high {
            assert!(edge, "strong pixel ({x},{y}) missing");
        }
        if p.0[0] < low {
            assert!(!edge, "weak pixel ({x},{y}) marked");
        }
    }
}

#[test]
fn every_strategy_gives_the_same_mask() {
    let img = textured(80, 60, 11);
    let run = |execution| {
        let config = CannyConfig {
            execution,
            ..CannyConfig::default()
        };
        detect_edges_staged(&img, &config).unwrap()
    };
    let serial = run(ExecutionStrategy::Serial);
    for strategy in [ExecutionStrategy::Parallel, ExecutionStrategy::Fixed(4)] {
        let other = run(strategy);
        assert_eq!(serial.smoothed, other.smoothed, "{strategy:?}");
        assert_eq!(serial.gradient.magnitude, other.gradient.magnitude);
        assert_eq!(serial.suppressed, other.suppressed);
        assert_eq!(serial.edges, other.edges);
    }
}

#[test]
fn rejects_bad_input() {
    let img = textured(20, 20, 1);
    assert!(matches!(
        detect_edges(&img, &with_thresholds(45, 105)),
        Err(PipelineError::Configuration(_))
    ));

    let config = CannyConfig {
        sigma: 2.6,
        ..CannyConfig::default()
    };
    assert_eq!(
        detect_edges(&GrayImage::new(12, 12), &config).unwrap_err(),
        PipelineError::Dimension {
            width: 12,
            height: 12,
            required: 13,
        }
    );

    let config = CannyConfig {
        execution: ExecutionStrategy::Fixed(0),
        ..CannyConfig::default()
    };
    assert!(matches!(
        detect_edges(&img, &config),
        Err(PipelineError::Configuration(_))
    ));
}
