// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: loading, downscaling, brightness/contrast adjustment and
// raster encoding. Operates on in-memory images using the `image` crate.

use docscan_core::error::DocscanError;
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
///
/// ```ignore
/// let png = ImageProcessor::open("receipt.jpg")?
///     .fit_within(1600)
///     .adjust_brightness(-51)
///     .adjust_contrast(1.4)
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, DocscanError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            DocscanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, DocscanError> {
        let img = image::load_from_memory(data)
            .map_err(|err| DocscanError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Consume the processor and return an 8-bit RGB buffer.
    pub fn into_rgb8(self) -> RgbImage {
        self.image.into_rgb8()
    }

    // -- Transformations ------------------------------------------------------

    /// Downscale so the longest side is at most `max_side`, preserving aspect
    /// ratio. Images already small enough are returned unchanged.
    #[instrument(skip(self), fields(max_side))]
    pub fn fit_within(self, max_side: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if w.max(h) <= max_side {
            return self;
        }
        let resized = self
            .image
            .resize(max_side, max_side, image::imageops::FilterType::Triangle);
        debug!(
            from_w = w,
            from_h = h,
            new_w = resized.width(),
            new_h = resized.height(),
            "Downscaled"
        );
        Self { image: resized }
    }

    /// Add `value` (-255..=255) to every colour channel.
    ///
    /// Positive values brighten, negative values darken.
    #[instrument(skip(self), fields(value))]
    pub fn adjust_brightness(self, value: i32) -> Self {
        let clamped = value.clamp(-255, 255);
        debug!(clamped, "Adjusting brightness");

        let mut rgb = self.image.into_rgb8();
        for pixel in rgb.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as i32 + clamped).clamp(0, 255) as u8;
            }
        }
        Self {
            image: DynamicImage::ImageRgb8(rgb),
        }
    }

    /// Scale each channel's distance from mid-grey by `factor`. Values > 1.0
    /// increase contrast; 1.0 is a no-op.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        debug!(factor, "Adjusting contrast");

        let mut rgb = self.image.into_rgb8();
        for pixel in rgb.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                let val = factor * (*channel as f32 - 128.0) + 128.0;
                *channel = val.round().clamp(0.0, 255.0) as u8;
            }
        }
        Self {
            image: DynamicImage::ImageRgb8(rgb),
        }
    }

    /// Unsharp mask. `threshold` is the minimum difference (0..=255) a pixel
    /// must have from its blurred value before it is sharpened.
    #[instrument(skip(self), fields(sigma, threshold))]
    pub fn unsharpen(self, sigma: f32, threshold: i32) -> Self {
        let rgb = self.image.into_rgb8();
        let sharpened = image::imageops::unsharpen(&rgb, sigma, threshold);
        Self {
            image: DynamicImage::ImageRgb8(sharpened),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, DocscanError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, DocscanError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| DocscanError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, DocscanError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| DocscanError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
