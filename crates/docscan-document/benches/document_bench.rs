// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the docscan-document crate: per-frame rectangle
// detection (the live-loop hot path) and the post-capture enhancement chain.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use docscan_core::config::EnhancementProfile;
use docscan_document::{
    ContourRectangleDetector, CorrectedDocumentImage, ImageEnhancer, RectangleDetector,
};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// A 1280x960 frame: dark desk with a skewed light page.
fn synthetic_frame() -> GrayImage {
    let mut img = GrayImage::from_pixel(1280, 960, Luma([35u8]));
    let page = [
        Point::new(240, 160),
        Point::new(1010, 190),
        Point::new(980, 820),
        Point::new(260, 790),
    ];
    draw_polygon_mut(&mut img, &page, Luma([225u8]));
    img
}

fn bench_detection(c: &mut Criterion) {
    let frame = synthetic_frame();
    let detector = ContourRectangleDetector::default();

    c.bench_function("rectangle_detection (1280x960)", |b| {
        b.iter(|| {
            let found = detector.detect_luma(black_box(&frame));
            black_box(found.map(|obs| obs.len()).unwrap_or(0));
        });
    });
}

fn bench_enhancement(c: &mut Criterion) {
    let page = RgbImage::from_fn(850, 1100, |x, y| {
        if y % 24 < 3 {
            Rgb([40, 40, 40])
        } else {
            let shade = 170 + (x / 20) as u8;
            Rgb([shade, shade, shade])
        }
    });

    let mut group = c.benchmark_group("enhancement (850x1100)");
    for (name, profile) in EnhancementProfile::builtin() {
        let enhancer = ImageEnhancer::new(profile);
        group.bench_function(name, |b| {
            b.iter(|| {
                let doc = CorrectedDocumentImage::new(black_box(page.clone()));
                black_box(enhancer.enhance(doc));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detection, bench_enhancement);
criterion_main!(benches);
