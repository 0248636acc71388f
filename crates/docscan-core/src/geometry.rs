// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plane geometry shared by the detector, the overlay mapper and the
// perspective corrector.
//
// Two coordinate spaces are in play:
//
// * **Vision space**: Normalized `[0, 1]` on both axes, origin at the
//   bottom-left of the frame, y pointing up. Rectangle observations live here.
// * **Image / screen space**: Pixels, origin at the top-left, y pointing down.

use serde::{Deserialize, Serialize};

/// A point in either coordinate space (the space is implied by context).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale a normalized point to the given extent (no axis flip).
    pub fn scaled(self, size: Size) -> Self {
        Self::new(self.x * size.width, self.y * size.height)
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Whether both coordinates are within `tolerance` of `other`.
    pub fn approx_eq(self, other: Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// A width/height pair in pixels (or points, for preview surfaces).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of a pixel buffer.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// Swap width and height (a 90° rotation of the extent).
    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A 2D affine transform with CoreGraphics-style row-vector semantics:
///
/// ```text
/// x' = a·x + c·y + tx
/// y' = b·x + d·y + ty
/// ```
///
/// `t1.then(&t2)` applies `t1` first and `t2` second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Counter-clockwise rotation by `radians` in a y-up frame.
    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Flip the vertical axis of an extent of the given height, turning a
    /// bottom-left origin into a top-left origin (and vice versa).
    pub fn vertical_flip(height: f64) -> Self {
        Self::scale(1.0, -1.0).then(&Self::translation(0.0, height))
    }

    /// Compose: apply `self`, then `next`.
    pub fn then(&self, next: &AffineTransform) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            tx: self.tx * next.a + self.ty * next.c + next.tx,
            ty: self.tx * next.b + self.ty * next.d + next.ty,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }
}

/// Four corners of a quadrilateral in image/screen space (y down), ordered
/// clockwise starting at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quad {
    /// Build from an unordered set of four points.
    ///
    /// Points are sorted by angle around their centroid (clockwise in a
    /// y-down frame) and the cycle is rotated so it starts at the point with
    /// the smallest `x + y`.
    pub fn from_unordered(points: [Point; 4]) -> Self {
        let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;

        let mut sorted = points;
        sorted.sort_by(|p, q| {
            let ap = (p.y - cy).atan2(p.x - cx);
            let aq = (q.y - cy).atan2(q.x - cx);
            ap.partial_cmp(&aq).unwrap_or(std::cmp::Ordering::Equal)
        });

        let start = sorted
            .iter()
            .enumerate()
            .min_by(|(_, p), (_, q)| {
                (p.x + p.y)
                    .partial_cmp(&(q.x + q.y))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        sorted.rotate_left(start);

        Self {
            top_left: sorted[0],
            top_right: sorted[1],
            bottom_right: sorted[2],
            bottom_left: sorted[3],
        }
    }

    /// Corners in clockwise order: `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Apply a function to every corner, keeping corner roles.
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            top_left: f(self.top_left),
            top_right: f(self.top_right),
            bottom_right: f(self.bottom_right),
            bottom_left: f(self.bottom_left),
        }
    }

    /// Mean length of the top and bottom edges.
    pub fn mean_width(&self) -> f64 {
        (self.top_left.distance(self.top_right) + self.bottom_left.distance(self.bottom_right))
            / 2.0
    }

    /// Mean length of the left and right edges.
    pub fn mean_height(&self) -> f64 {
        (self.top_left.distance(self.bottom_left) + self.top_right.distance(self.bottom_right))
            / 2.0
    }

    /// Area via the shoelace formula.
    pub fn area(&self) -> f64 {
        polygon_area(&self.corners())
    }

    /// True when every turn along the outline has the same sign.
    pub fn is_convex(&self) -> bool {
        let c = self.corners();
        let mut sign = 0.0f64;
        for i in 0..4 {
            let (p0, p1, p2) = (c[i], c[(i + 1) % 4], c[(i + 2) % 4]);
            let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
            if cross.abs() < f64::EPSILON {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

/// Area of a simple polygon given by its vertices in order (CW or CCW).
pub fn polygon_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    area.abs() / 2.0
}

/// A detected document boundary in vision space.
///
/// Immutable once produced; superseded by the next observation or cleared by
/// a tracker reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangleObservation {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

impl RectangleObservation {
    /// Build an observation from a pixel-space quad of an image with the
    /// given extent, converting to normalized bottom-left-origin coordinates.
    pub fn from_image_quad(quad: &Quad, extent: Size, confidence: f32) -> Self {
        let to_vision = |p: Point| {
            Point::new(
                (p.x / extent.width).clamp(0.0, 1.0),
                (1.0 - p.y / extent.height).clamp(0.0, 1.0),
            )
        };
        Self {
            top_left: to_vision(quad.top_left),
            top_right: to_vision(quad.top_right),
            bottom_left: to_vision(quad.bottom_left),
            bottom_right: to_vision(quad.bottom_right),
            confidence,
        }
    }

    /// Corners as a quad, still in vision space.
    pub fn normalized_quad(&self) -> Quad {
        Quad {
            top_left: self.top_left,
            top_right: self.top_right,
            bottom_right: self.bottom_right,
            bottom_left: self.bottom_left,
        }
    }

    /// Denormalize against an image extent and flip into top-left-origin
    /// pixel coordinates.
    pub fn to_image_quad(&self, extent: Size) -> Quad {
        let flip = AffineTransform::vertical_flip(extent.height);
        self.normalized_quad()
            .map(|p| flip.apply(p.scaled(extent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoelace_area_rectangle() {
        let quad = Quad {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(10.0, 0.0),
            bottom_right: Point::new(10.0, 5.0),
            bottom_left: Point::new(0.0, 5.0),
        };
        assert!((quad.area() - 50.0).abs() < 1e-9);
        assert!(quad.is_convex());
    }

    #[test]
    fn then_applies_left_to_right() {
        let t = AffineTransform::translation(5.0, 0.0).then(&AffineTransform::scale(2.0, 2.0));
        let p = t.apply(Point::new(1.0, 1.0));
        assert!(p.approx_eq(Point::new(12.0, 2.0), 1e-9), "{p:?}");
    }

    #[test]
    fn vertical_flip_moves_origin_to_top() {
        let flip = AffineTransform::vertical_flip(100.0);
        assert!(flip.apply(Point::new(3.0, 0.0)).approx_eq(Point::new(3.0, 100.0), 1e-9));
        assert!(flip.apply(Point::new(3.0, 25.0)).approx_eq(Point::new(3.0, 75.0), 1e-9));
    }

    #[test]
    fn quarter_turn_rotation() {
        let r = AffineTransform::rotation(std::f64::consts::FRAC_PI_2);
        assert!(r.apply(Point::new(1.0, 0.0)).approx_eq(Point::new(0.0, 1.0), 1e-9));
    }

    #[test]
    fn from_unordered_assigns_corner_roles() {
        let quad = Quad::from_unordered([
            Point::new(90.0, 80.0),
            Point::new(10.0, 12.0),
            Point::new(12.0, 85.0),
            Point::new(95.0, 8.0),
        ]);
        assert_eq!(quad.top_left, Point::new(10.0, 12.0));
        assert_eq!(quad.top_right, Point::new(95.0, 8.0));
        assert_eq!(quad.bottom_right, Point::new(90.0, 80.0));
        assert_eq!(quad.bottom_left, Point::new(12.0, 85.0));
    }

    #[test]
    fn concave_quad_is_rejected() {
        let quad = Quad {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(10.0, 0.0),
            bottom_right: Point::new(2.0, 2.0),
            bottom_left: Point::new(0.0, 10.0),
        };
        assert!(!quad.is_convex());
    }

    #[test]
    fn observation_image_quad_roundtrip() {
        let extent = Size::new(400.0, 300.0);
        let quad = Quad {
            top_left: Point::new(40.0, 30.0),
            top_right: Point::new(360.0, 45.0),
            bottom_right: Point::new(350.0, 270.0),
            bottom_left: Point::new(50.0, 260.0),
        };
        let obs = RectangleObservation::from_image_quad(&quad, extent, 1.0);
        // Top of the image is the top of vision space.
        assert!(obs.top_left.y > obs.bottom_left.y);
        let back = obs.to_image_quad(extent);
        for (a, b) in back.corners().iter().zip(quad.corners().iter()) {
            assert!(a.approx_eq(*b, 1e-9), "{a:?} != {b:?}");
        }
    }
}
