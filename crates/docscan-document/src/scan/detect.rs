// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectangle detection: finds the outline of a document in a single image.
//
// The portable detector works on luma only:
//
// 1. Downscale to the working resolution
// 2. Gaussian blur (sigma 1.5), Canny edges, one dilation pass
// 3. Trace outer contour borders
// 4. Douglas-Peucker simplification; keep convex quadrilaterals
// 5. Measure aspect ratio, size and fill-based confidence
// 6. Filter, rank, truncate, convert to vision space
//
// An empty result is a valid outcome, not an error.

use std::cmp::Ordering;

use docscan_core::config::DetectorConfig;
use docscan_core::error::{DocscanError, Result};
use docscan_core::geometry::{Point, Quad, RectangleObservation, Size, polygon_area};
use docscan_core::types::Frame;
use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::dilate;
use tracing::{debug, instrument, trace};

use crate::image::frame::frame_to_luma;
use crate::image::processor::ImageProcessor;

const BLUR_SIGMA: f32 = 1.5;
const CANNY_LOW: f32 = 20.0;
const CANNY_HIGH: f32 = 60.0;
/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
const SIMPLIFY_EPSILON: f64 = 0.02;
/// Fill ratio at which a candidate reaches full confidence.
const FULL_CONFIDENCE_FILL: f64 = 0.9;
/// Contours shorter than this many points are noise.
const MIN_CONTOUR_POINTS: usize = 16;

/// Finds document rectangles in an image.
///
/// Implementations return at most the configured maximum number of
/// observations, best first. Platforms with a native vision engine can plug it
/// in here; [`ContourRectangleDetector`] is the portable implementation.
pub trait RectangleDetector: Send + Sync {
    /// Detect rectangles in a luminance image.
    fn detect_luma(&self, image: &GrayImage) -> Result<Vec<RectangleObservation>>;

    /// Detect rectangles in a raw camera frame.
    fn detect_frame(&self, frame: &Frame) -> Result<Vec<RectangleObservation>> {
        let luma = frame_to_luma(frame).map_err(|err| DocscanError::Recognition(err.to_string()))?;
        self.detect_luma(&luma)
    }

    /// Detect rectangles in a decoded still image.
    fn detect_image(&self, image: &DynamicImage) -> Result<Vec<RectangleObservation>> {
        self.detect_luma(&image.to_luma8())
    }
}

/// A quadrilateral that survived shape filtering, in working-image pixels.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    quad: Quad,
    area: f64,
    confidence: f32,
}

/// Contour-based rectangle detector built on `imageproc`.
#[derive(Debug, Clone, Default)]
pub struct ContourRectangleDetector {
    config: DetectorConfig,
}

impl ContourRectangleDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Measure a convex quad against the geometric constraints.
    fn evaluate(&self, quad: Quad, contour_area: f64, extent: (u32, u32)) -> Option<Candidate> {
        let (width, height) = (quad.mean_width(), quad.mean_height());
        if height <= 0.0 || width <= 0.0 {
            return None;
        }

        let aspect = width / height;
        if aspect < self.config.min_aspect_ratio || aspect > self.config.max_aspect_ratio {
            trace!(aspect, "candidate rejected: aspect ratio");
            return None;
        }

        let size = width.min(height) / extent.0.min(extent.1) as f64;
        if size < self.config.min_size {
            trace!(size, "candidate rejected: too small");
            return None;
        }

        let area = quad.area();
        let fill = contour_area / area;
        let confidence = (fill / FULL_CONFIDENCE_FILL).min(1.0) as f32;
        if confidence < self.config.min_confidence {
            trace!(fill, confidence, "candidate rejected: confidence");
            return None;
        }

        Some(Candidate {
            quad,
            area,
            confidence,
        })
    }
}

impl RectangleDetector for ContourRectangleDetector {
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn detect_luma(&self, image: &GrayImage) -> Result<Vec<RectangleObservation>> {
        let (orig_w, orig_h) = image.dimensions();
        if orig_w < 3 || orig_h < 3 {
            return Err(DocscanError::Recognition(format!(
                "image {orig_w}x{orig_h} is too small to analyse"
            )));
        }

        // Step 1: working resolution.
        let working = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(image.clone()))
            .fit_within(self.config.working_resolution)
            .into_dynamic()
            .into_luma8();
        let (work_w, work_h) = working.dimensions();
        let scale = orig_w as f64 / work_w as f64;

        // Step 2: edges.
        let blurred = gaussian_blur_f32(&working, BLUR_SIGMA);
        let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
        let edges = dilate(&edges, Norm::LInf, 1);

        // Step 3: outer borders.
        let contours = find_contours::<i32>(&edges);
        debug!(contours = contours.len(), work_w, work_h, "contours traced");

        // Steps 4-5: shape filtering.
        let mut candidates: Vec<Candidate> = contours
            .iter()
            .filter(|c| {
                matches!(c.border_type, BorderType::Outer) && c.points.len() >= MIN_CONTOUR_POINTS
            })
            .filter_map(|contour| {
                let perimeter = arc_length(&contour.points, true);
                if perimeter <= 0.0 {
                    return None;
                }
                let epsilon = SIMPLIFY_EPSILON * perimeter;
                let outline = simplify_outline(&contour.points, epsilon);
                if outline.len() != 4 {
                    return None;
                }
                let quad = Quad::from_unordered([outline[0], outline[1], outline[2], outline[3]]);
                if !quad.is_convex() {
                    return None;
                }
                let traced: Vec<Point> = contour
                    .points
                    .iter()
                    .map(|p| Point::new(p.x as f64, p.y as f64))
                    .collect();
                self.evaluate(quad, polygon_area(&traced), (work_w, work_h))
            })
            .collect();

        // Step 6: rank best first.
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then(b.area.partial_cmp(&a.area).unwrap_or(Ordering::Equal))
        });
        candidates.truncate(self.config.max_observations);

        let extent = Size::from_pixels(orig_w, orig_h);
        let observations: Vec<RectangleObservation> = candidates
            .iter()
            .map(|c| {
                let quad = c.quad.map(|p| Point::new(p.x * scale, p.y * scale));
                RectangleObservation::from_image_quad(&quad, extent, c.confidence)
            })
            .collect();

        debug!(found = observations.len(), "rectangle detection complete");
        Ok(observations)
    }
}

/// Simplify a closed contour and drop vertices that sit within `epsilon` of
/// the line joining their neighbours, down to a minimum of four.
fn simplify_outline(points: &[imageproc::point::Point<i32>], epsilon: f64) -> Vec<Point> {
    let mut outline: Vec<Point> = approximate_polygon_dp(points, epsilon, true)
        .iter()
        .map(|p| Point::new(p.x as f64, p.y as f64))
        .collect();

    while outline.len() > 4 {
        let n = outline.len();
        let flattest = (0..n)
            .map(|i| {
                let prev = outline[(i + n - 1) % n];
                let next = outline[(i + 1) % n];
                (i, distance_to_line(outline[i], prev, next))
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        match flattest {
            Some((i, deviation)) if deviation < epsilon => {
                outline.remove(i);
            }
            _ => break,
        }
    }
    outline
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
fn distance_to_line(p: Point, a: Point, b: Point) -> f64 {
    let len = a.distance(b);
    if len < f64::EPSILON {
        return p.distance(a);
    }
    ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / len
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point as Vertex;

    fn scene(width: u32, height: u32, corners: &[(i32, i32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([30u8]));
        let poly: Vec<Vertex<i32>> = corners.iter().map(|&(x, y)| Vertex::new(x, y)).collect();
        draw_polygon_mut(&mut img, &poly, Luma([230u8]));
        img
    }

    #[test]
    fn finds_skewed_document() {
        let corners = [(60, 50), (340, 70), (330, 250), (70, 240)];
        let img = scene(400, 300, &corners);

        let found = ContourRectangleDetector::default().detect_luma(&img).unwrap();
        assert_eq!(found.len(), 1);
        let obs = found[0];
        assert!((obs.confidence - 1.0).abs() < f32::EPSILON);

        let quad = obs.to_image_quad(Size::new(400.0, 300.0));
        let expected = Quad {
            top_left: Point::new(60.0, 50.0),
            top_right: Point::new(340.0, 70.0),
            bottom_right: Point::new(330.0, 250.0),
            bottom_left: Point::new(70.0, 240.0),
        };
        for (got, want) in quad.corners().iter().zip(expected.corners().iter()) {
            assert!(got.approx_eq(*want, 8.0), "{got:?} vs {want:?}");
        }
    }

    #[test]
    fn downscaled_detection_maps_back_to_full_resolution() {
        let corners = [(200, 150), (1000, 170), (980, 800), (220, 780)];
        let img = scene(1280, 960, &corners);

        let found = ContourRectangleDetector::default().detect_luma(&img).unwrap();
        assert_eq!(found.len(), 1);
        let quad = found[0].to_image_quad(Size::new(1280.0, 960.0));
        assert!(quad.top_left.approx_eq(Point::new(200.0, 150.0), 16.0), "{quad:?}");
        assert!(quad.bottom_right.approx_eq(Point::new(980.0, 800.0), 16.0), "{quad:?}");
    }

    #[test]
    fn blank_frame_is_empty_not_error() {
        let img = GrayImage::from_pixel(320, 240, Luma([128u8]));
        assert!(ContourRectangleDetector::default().detect_luma(&img).unwrap().is_empty());
    }

    #[test]
    fn small_rectangle_rejected() {
        // Shorter side 20px of a 240px frame is below the 0.15 minimum.
        let img = scene(320, 240, &[(100, 100), (140, 100), (140, 120), (100, 120)]);
        assert!(ContourRectangleDetector::default().detect_luma(&img).unwrap().is_empty());
    }

    #[test]
    fn elongated_strip_rejected() {
        // 300 x 60: aspect ratio 5 exceeds the 4.0 maximum.
        let img = scene(400, 300, &[(50, 100), (350, 100), (350, 160), (50, 160)]);
        assert!(ContourRectangleDetector::default().detect_luma(&img).unwrap().is_empty());
    }

    #[test]
    fn triangle_is_not_a_document() {
        let img = scene(400, 300, &[(200, 30), (360, 260), (40, 260)]);
        assert!(ContourRectangleDetector::default().detect_luma(&img).unwrap().is_empty());
    }

    #[test]
    fn max_observations_keeps_largest() {
        let mut img = scene(600, 400, &[(30, 40), (260, 40), (260, 360), (30, 360)]);
        let poly = [(320, 80), (560, 80), (560, 300), (320, 300)]
            .map(|(x, y)| Vertex::new(x, y));
        draw_polygon_mut(&mut img, &poly, Luma([230u8]));

        let config = DetectorConfig {
            max_observations: 1,
            ..DetectorConfig::default()
        };
        let found = ContourRectangleDetector::new(config).detect_luma(&img).unwrap();
        assert_eq!(found.len(), 1);
        // The left document (230 x 320) is larger than the right (240 x 220).
        let quad = found[0].to_image_quad(Size::new(600.0, 400.0));
        assert!(quad.top_left.x < 100.0, "{quad:?}");

        let config = DetectorConfig {
            max_observations: 2,
            ..DetectorConfig::default()
        };
        let found = ContourRectangleDetector::new(config).detect_luma(&img).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn tiny_image_is_recognition_error() {
        let img = GrayImage::new(2, 2);
        assert!(matches!(
            ContourRectangleDetector::default().detect_luma(&img),
            Err(DocscanError::Recognition(_))
        ));
    }

    #[test]
    fn outline_starting_mid_edge_reduces_to_corners() {
        // A traced square border that starts halfway along the top edge, as a
        // contour tracer can produce for a rotated document.
        let mut border = Vec::new();
        border.extend((50..100).map(|x| (x, 0)));
        border.extend((0..100).map(|y| (100, y)));
        border.extend((0..100).map(|x| (100 - x, 100)));
        border.extend((0..100).map(|y| (0, 100 - y)));
        border.extend((0..50).map(|x| (x, 0)));
        let points: Vec<Vertex<i32>> = border.into_iter().map(|(x, y)| Vertex::new(x, y)).collect();

        let outline = simplify_outline(&points, 0.02 * arc_length(&points, true));
        assert_eq!(outline.len(), 4, "{outline:?}");
        assert!(!outline.contains(&Point::new(50.0, 0.0)));
    }
}
