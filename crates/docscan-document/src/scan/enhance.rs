// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image enhancement: the fixed filter chain applied after perspective
// correction: document (background normalisation), brightness, contrast, and
// an optional luminance sharpening pass. Parameters come from an
// `EnhancementProfile` and never from image statistics.

use docscan_core::config::EnhancementProfile;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;
use crate::scan::perspective::CorrectedDocumentImage;

/// Longest side of the plane the paper background is estimated on.
const BACKGROUND_PLANE: u32 = 256;
/// Blur applied to the background plane, in plane pixels.
const BACKGROUND_SIGMA: f32 = 12.0;
/// Upper bound on the per-pixel background gain.
const MAX_GAIN: f32 = 3.0;

/// Applies an enhancement profile to corrected documents.
#[derive(Debug, Clone, Default)]
pub struct ImageEnhancer {
    profile: EnhancementProfile,
}

impl ImageEnhancer {
    pub fn new(profile: EnhancementProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &EnhancementProfile {
        &self.profile
    }

    /// Run the full chain. Deterministic for identical input and profile.
    #[instrument(skip(self, document), fields(width = document.width(), height = document.height()))]
    pub fn enhance(&self, document: CorrectedDocumentImage) -> CorrectedDocumentImage {
        let p = &self.profile;
        info!(
            document_amount = p.document_amount,
            brightness = p.brightness,
            contrast = p.contrast,
            sharpen = p.sharpen.is_some(),
            "Enhancing document"
        );

        // Step 1: document enhancement.
        let normalised = normalise_background(document.into_image(), p.document_amount);

        // Steps 2+3: brightness then contrast.
        let mut processor = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(normalised))
            .adjust_brightness((p.brightness * 255.0).round() as i32)
            .adjust_contrast(p.contrast);

        // Step 4: optional sharpening.
        if let Some(sharpen) = p.sharpen {
            processor = processor.unsharpen(sharpen.sigma, sharpen.threshold);
        }

        CorrectedDocumentImage::new(processor.into_rgb8())
    }
}

/// Flatten uneven lighting by dividing out a blurred luma background and
/// blending the result with the original by `amount`.
fn normalise_background(mut image: RgbImage, amount: f32) -> RgbImage {
    let amount = amount.clamp(0.0, 1.0);
    if amount == 0.0 || image.width() == 0 || image.height() == 0 {
        return image;
    }

    let background = estimate_background(&image);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let bg = background.get_pixel(x, y).0[0].max(1) as f32;
        let gain = (255.0 / bg).min(MAX_GAIN);
        for channel in pixel.0.iter_mut() {
            let c = *channel as f32;
            let lifted = (c * gain).min(255.0);
            *channel = (c + (lifted - c) * amount).round().clamp(0.0, 255.0) as u8;
        }
    }
    image
}

/// Smooth luma background at full resolution, estimated on a small plane.
fn estimate_background(image: &RgbImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let luma = DynamicImage::ImageRgb8(image.clone()).into_luma8();
    let plane = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(luma))
        .fit_within(BACKGROUND_PLANE)
        .into_dynamic()
        .into_luma8();
    let blurred = gaussian_blur_f32(&plane, BACKGROUND_SIGMA);
    debug!(
        plane_w = plane.width(),
        plane_h = plane.height(),
        "Background estimated"
    );
    image::imageops::resize(&blurred, w, h, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// A page with a lighting gradient and a few dark "text" bars.
    fn page() -> CorrectedDocumentImage {
        let img = RgbImage::from_fn(120, 160, |x, y| {
            let shade = 150 + (x * 80 / 120) as u8;
            if y % 20 < 3 && (10..110).contains(&x) {
                Rgb([40, 40, 40])
            } else {
                Rgb([shade, shade, shade])
            }
        });
        CorrectedDocumentImage::new(img)
    }

    #[test]
    fn enhancement_is_deterministic() {
        for profile in [
            EnhancementProfile::STANDARD,
            EnhancementProfile::SHARPENED,
            EnhancementProfile::GENTLE,
        ] {
            let enhancer = ImageEnhancer::new(profile);
            let a = enhancer.enhance(page());
            let b = enhancer.enhance(page());
            assert_eq!(a, b, "{profile:?}");
        }
    }

    #[test]
    fn dimensions_are_preserved() {
        let out = ImageEnhancer::default().enhance(page());
        assert_eq!((out.width(), out.height()), (120, 160));
    }

    #[test]
    fn background_normalisation_flattens_gradient() {
        let flat = normalise_background(page().into_image(), 1.0);
        let left = flat.get_pixel(5, 10).0[0] as i32;
        let right = flat.get_pixel(115, 10).0[0] as i32;
        let before = 150 + (115 * 80 / 120) - 150 - (5 * 80 / 120);
        assert!((right - left).abs() < before, "{left} .. {right}");
    }

    #[test]
    fn text_stays_darker_than_paper() {
        let out = ImageEnhancer::default().enhance(page()).into_image();
        let text = out.get_pixel(60, 1).0[0];
        let paper = out.get_pixel(60, 10).0[0];
        assert!(text < paper, "text {text} paper {paper}");
    }

    #[test]
    fn zero_amount_is_identity() {
        let original = page().into_image();
        assert_eq!(normalise_background(original.clone(), 0.0), original);
    }
}
