// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate mapping from vision space to the preview surface.
//
// Buffers always arrive in the sensor's landscape-left orientation. A point
// is flipped into a top-left origin, rotated into the device orientation
// (still normalized), then placed on the preview according to its gravity.

use std::f64::consts::{FRAC_PI_2, PI};

use docscan_core::geometry::{AffineTransform, Quad, RectangleObservation, Size};
use docscan_core::types::{DeviceOrientation, PreviewGravity};
use tracing::debug;

/// Normalized-space rotation from buffer orientation into `orientation`.
pub fn orientation_transform(orientation: DeviceOrientation) -> AffineTransform {
    match orientation {
        DeviceOrientation::LandscapeLeft => AffineTransform::IDENTITY,
        DeviceOrientation::LandscapeRight => {
            AffineTransform::rotation(PI).then(&AffineTransform::translation(1.0, 1.0))
        }
        DeviceOrientation::Portrait => {
            AffineTransform::rotation(-FRAC_PI_2).then(&AffineTransform::translation(0.0, 1.0))
        }
        DeviceOrientation::PortraitUpsideDown => {
            AffineTransform::rotation(FRAC_PI_2).then(&AffineTransform::translation(1.0, 0.0))
        }
    }
}

/// Map an observation onto a preview of the given size, stretching the
/// oriented buffer over the whole surface.
pub fn map_to_screen(
    observation: &RectangleObservation,
    preview: Size,
    orientation: DeviceOrientation,
) -> Quad {
    let transform = compose(orientation, preview, None, PreviewGravity::Resize);
    observation.normalized_quad().map(|p| transform.apply(p))
}

fn compose(
    orientation: DeviceOrientation,
    preview: Size,
    buffer: Option<Size>,
    gravity: PreviewGravity,
) -> AffineTransform {
    let normalized = AffineTransform::vertical_flip(1.0).then(&orientation_transform(orientation));
    normalized.then(&placement(orientation, preview, buffer, gravity))
}

/// Denormalize onto the preview surface.
fn placement(
    orientation: DeviceOrientation,
    preview: Size,
    buffer: Option<Size>,
    gravity: PreviewGravity,
) -> AffineTransform {
    let stretch = AffineTransform::scale(preview.width, preview.height);
    let Some(buffer) = buffer.filter(|b| !b.is_empty()) else {
        return stretch;
    };
    let oriented = if orientation.is_portrait() {
        buffer.transposed()
    } else {
        buffer
    };

    let sx = preview.width / oriented.width;
    let sy = preview.height / oriented.height;
    let s = match gravity {
        PreviewGravity::Resize => return stretch,
        PreviewGravity::ResizeAspect => sx.min(sy),
        PreviewGravity::ResizeAspectFill => sx.max(sy),
    };
    let content = Size::new(oriented.width * s, oriented.height * s);
    AffineTransform::scale(content.width, content.height).then(&AffineTransform::translation(
        (preview.width - content.width) / 2.0,
        (preview.height - content.height) / 2.0,
    ))
}

/// Cached vision-to-preview transform.
///
/// Every setter recomputes the transform before returning, so the next
/// `map` always reflects the current orientation and geometry.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    orientation: DeviceOrientation,
    preview: Size,
    buffer: Option<Size>,
    gravity: PreviewGravity,
    transform: AffineTransform,
}

impl CoordinateMapper {
    pub fn new(preview: Size, orientation: DeviceOrientation) -> Self {
        let mut mapper = Self {
            orientation,
            preview,
            buffer: None,
            gravity: PreviewGravity::Resize,
            transform: AffineTransform::IDENTITY,
        };
        mapper.recompute();
        mapper
    }

    /// Fit a buffer of known size into the preview with `gravity`.
    pub fn with_buffer(mut self, buffer: Size, gravity: PreviewGravity) -> Self {
        self.buffer = Some(buffer);
        self.gravity = gravity;
        self.recompute();
        self
    }

    pub fn orientation(&self) -> DeviceOrientation {
        self.orientation
    }

    pub fn preview(&self) -> Size {
        self.preview
    }

    pub fn transform(&self) -> AffineTransform {
        self.transform
    }

    pub fn set_orientation(&mut self, orientation: DeviceOrientation) {
        if self.orientation != orientation {
            self.orientation = orientation;
            self.recompute();
        }
    }

    pub fn set_preview(&mut self, preview: Size) {
        self.preview = preview;
        self.recompute();
    }

    pub fn set_buffer(&mut self, buffer: Option<Size>) {
        if self.buffer != buffer {
            self.buffer = buffer;
            self.recompute();
        }
    }

    pub fn set_gravity(&mut self, gravity: PreviewGravity) {
        self.gravity = gravity;
        self.recompute();
    }

    /// Corners of `observation` on the preview surface.
    pub fn map(&self, observation: &RectangleObservation) -> Quad {
        observation.normalized_quad().map(|p| self.transform.apply(p))
    }

    fn recompute(&mut self) {
        self.transform = compose(self.orientation, self.preview, self.buffer, self.gravity);
        debug!(
            orientation = ?self.orientation,
            preview_w = self.preview.width,
            preview_h = self.preview.height,
            gravity = ?self.gravity,
            "Overlay transform recomputed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_core::geometry::Point;

    const TOLERANCE: f64 = 1e-9;

    fn observation() -> RectangleObservation {
        RectangleObservation {
            top_left: Point::new(0.2, 0.7),
            top_right: Point::new(0.6, 0.8),
            bottom_left: Point::new(0.1, 0.2),
            bottom_right: Point::new(0.7, 0.3),
            confidence: 1.0,
        }
    }

    fn assert_point(actual: Point, expected: (f64, f64)) {
        assert!(
            actual.approx_eq(Point::new(expected.0, expected.1), TOLERANCE),
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn landscape_left_is_flip_only() {
        let quad = map_to_screen(
            &observation(),
            Size::new(400.0, 300.0),
            DeviceOrientation::LandscapeLeft,
        );
        assert_point(quad.top_left, (80.0, 90.0));
        assert_point(quad.bottom_right, (280.0, 210.0));
    }

    #[test]
    fn landscape_right_rotates_half_turn() {
        let quad = map_to_screen(
            &observation(),
            Size::new(400.0, 300.0),
            DeviceOrientation::LandscapeRight,
        );
        assert_point(quad.top_left, (320.0, 210.0));
        assert_point(quad.bottom_right, (120.0, 90.0));
    }

    #[test]
    fn portrait_rotates_quarter_turn() {
        let quad = map_to_screen(
            &observation(),
            Size::new(300.0, 400.0),
            DeviceOrientation::Portrait,
        );
        assert_point(quad.top_left, (90.0, 320.0));
        assert_point(quad.bottom_right, (210.0, 120.0));
    }

    #[test]
    fn portrait_upside_down_rotates_other_way() {
        let quad = map_to_screen(
            &observation(),
            Size::new(300.0, 400.0),
            DeviceOrientation::PortraitUpsideDown,
        );
        assert_point(quad.top_left, (210.0, 80.0));
        assert_point(quad.bottom_right, (90.0, 280.0));
    }

    #[test]
    fn orientation_change_recomputes_before_next_map() {
        let mut mapper =
            CoordinateMapper::new(Size::new(400.0, 300.0), DeviceOrientation::LandscapeLeft);
        let before = mapper.map(&observation());
        mapper.set_orientation(DeviceOrientation::LandscapeRight);
        let after = mapper.map(&observation());
        assert_point(before.top_left, (80.0, 90.0));
        assert_point(after.top_left, (320.0, 210.0));
    }

    #[test]
    fn aspect_fill_crops_centrally() {
        let mapper = CoordinateMapper::new(Size::new(400.0, 400.0), DeviceOrientation::LandscapeLeft)
            .with_buffer(Size::new(400.0, 300.0), PreviewGravity::ResizeAspectFill);
        let centre = RectangleObservation {
            top_left: Point::new(0.5, 0.5),
            top_right: Point::new(1.0, 1.0),
            bottom_left: Point::new(0.0, 0.0),
            bottom_right: Point::new(1.0, 0.0),
            confidence: 1.0,
        };
        let quad = mapper.map(&centre);
        assert_point(quad.top_left, (200.0, 200.0));
        let overhang = (400.0 * 4.0 / 3.0 - 400.0) / 2.0;
        assert_point(quad.bottom_left, (-overhang, 400.0));
    }

    #[test]
    fn aspect_fit_letterboxes() {
        let mapper = CoordinateMapper::new(Size::new(400.0, 400.0), DeviceOrientation::LandscapeLeft)
            .with_buffer(Size::new(400.0, 300.0), PreviewGravity::ResizeAspect);
        let corner = RectangleObservation {
            top_left: Point::new(0.0, 1.0),
            top_right: Point::new(1.0, 1.0),
            bottom_left: Point::new(0.0, 0.0),
            bottom_right: Point::new(1.0, 0.0),
            confidence: 1.0,
        };
        let quad = mapper.map(&corner);
        assert_point(quad.top_left, (0.0, 50.0));
        assert_point(quad.bottom_right, (400.0, 350.0));
    }

    #[test]
    fn portrait_buffer_is_transposed_for_gravity() {
        let mapper = CoordinateMapper::new(Size::new(300.0, 400.0), DeviceOrientation::Portrait)
            .with_buffer(Size::new(400.0, 300.0), PreviewGravity::ResizeAspectFill);
        let stretched = map_to_screen(
            &observation(),
            Size::new(300.0, 400.0),
            DeviceOrientation::Portrait,
        );
        let fitted = mapper.map(&observation());
        assert_point(fitted.top_left, (stretched.top_left.x, stretched.top_left.y));
    }
}
