// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective correction: warps the detected document quadrilateral of a
// still image onto an axis-aligned rectangle.

use chrono::{DateTime, Utc};
use docscan_core::error::{DocscanError, Result};
use docscan_core::geometry::{Quad, RectangleObservation, Size};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument};

/// One high-resolution photo plus the observation in force when it was taken.
///
/// Consumed once by the corrector.
#[derive(Debug, Clone)]
pub struct CapturedStill {
    pub image: DynamicImage,
    /// Document outline in the still's own vision space, if one is known.
    pub observation: Option<RectangleObservation>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedStill {
    pub fn new(image: DynamicImage, observation: Option<RectangleObservation>) -> Self {
        Self {
            image,
            observation,
            captured_at: Utc::now(),
        }
    }

    pub fn extent(&self) -> Size {
        Size::from_pixels(self.image.width(), self.image.height())
    }
}

/// The final perspective-corrected (and later enhanced) raster.
///
/// Ownership passes to the export collaborator; the pipeline keeps no copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedDocumentImage {
    image: RgbImage,
}

impl CorrectedDocumentImage {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Four-point-to-rectangle projective warp.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectiveCorrector;

impl PerspectiveCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Correct a captured still using its observation.
    ///
    /// Fails with [`DocscanError::NoDocumentDetected`] when the still carries
    /// no observation.
    #[instrument(skip(self, still), fields(width = still.image.width(), height = still.image.height()))]
    pub fn correct(&self, still: CapturedStill) -> Result<CorrectedDocumentImage> {
        let observation = still.observation.ok_or(DocscanError::NoDocumentDetected)?;
        self.correct_image(&still.image, &observation)
    }

    /// Warp `image` so the observation's corners land on the output bounds.
    ///
    /// The observation is denormalized against `image`'s own extent, never a
    /// preview extent.
    pub fn correct_image(
        &self,
        image: &DynamicImage,
        observation: &RectangleObservation,
    ) -> Result<CorrectedDocumentImage> {
        let extent = Size::from_pixels(image.width(), image.height());
        if extent.is_empty() {
            return Err(DocscanError::ImageError("still image is empty".into()));
        }
        let quad = observation.to_image_quad(extent);
        let (out_w, out_h) = output_size(&quad);
        debug!(?quad, out_w, out_h, "document corners in still pixels");

        let corner = |i: usize| {
            let p = quad.corners()[i];
            (p.x as f32, p.y as f32)
        };
        let src = [corner(0), corner(1), corner(2), corner(3)];
        let dest = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];

        let projection = Projection::from_control_points(src, dest).ok_or_else(|| {
            DocscanError::ImageError("document corners do not form a valid quadrilateral".into())
        })?;

        let input = image.to_rgb8();
        let mut output = RgbImage::new(out_w, out_h);
        warp_into(
            &input,
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );

        info!(out_w, out_h, "Perspective correction applied");
        Ok(CorrectedDocumentImage::new(output))
    }
}

/// Output rectangle: the longer of each pair of opposite edges.
fn output_size(quad: &Quad) -> (u32, u32) {
    let top = quad.top_left.distance(quad.top_right);
    let bottom = quad.bottom_left.distance(quad.bottom_right);
    let left = quad.top_left.distance(quad.bottom_left);
    let right = quad.top_right.distance(quad.bottom_right);
    let w = top.max(bottom).round().max(1.0) as u32;
    let h = left.max(right).round().max(1.0) as u32;
    (w, h)
}
