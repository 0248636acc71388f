// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Camera frame decoding. Turns raw BGRA or NV12 buffers into `image` buffers:
// luma for the detector, RGBA for stills and previews.

use docscan_core::error::{DocscanError, Result};
use docscan_core::types::{Frame, PixelFormat};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use tracing::instrument;

/// Check the buffer is large enough for the declared geometry.
fn validate(frame: &Frame) -> Result<()> {
    if frame.width == 0 || frame.height == 0 {
        return Err(DocscanError::ImageError(format!(
            "empty frame {}x{}",
            frame.width, frame.height
        )));
    }
    let min_stride = frame.format.min_bytes_per_row(frame.width);
    if frame.bytes_per_row < min_stride {
        return Err(DocscanError::ImageError(format!(
            "row stride {} is smaller than {} for a {}-pixel-wide {:?} frame",
            frame.bytes_per_row, min_stride, frame.width, frame.format
        )));
    }
    let needed = frame.format.buffer_len(frame.height, frame.bytes_per_row);
    if frame.data.len() < needed {
        return Err(DocscanError::ImageError(format!(
            "frame buffer holds {} bytes, {:?} {}x{} needs {}",
            frame.data.len(),
            frame.format,
            frame.width,
            frame.height,
            needed
        )));
    }
    Ok(())
}

/// Extract the luminance plane. NV12 frames use the Y plane directly.
#[instrument(skip(frame), fields(width = frame.width, height = frame.height, format = ?frame.format))]
pub fn frame_to_luma(frame: &Frame) -> Result<GrayImage> {
    validate(frame)?;
    let stride = frame.bytes_per_row;
    let data = &frame.data;

    let gray = match frame.format {
        PixelFormat::Nv12 => GrayImage::from_fn(frame.width, frame.height, |x, y| {
            Luma([data[y as usize * stride + x as usize]])
        }),
        PixelFormat::Bgra8 => GrayImage::from_fn(frame.width, frame.height, |x, y| {
            let i = y as usize * stride + x as usize * 4;
            let (b, g, r) = (data[i] as u32, data[i + 1] as u32, data[i + 2] as u32);
            // BT.601 weights in 8.8 fixed point.
            Luma([((77 * r + 150 * g + 29 * b) >> 8) as u8])
        }),
    };
    Ok(gray)
}

/// Convert to RGBA. NV12 uses the BT.601 full-range matrix.
#[instrument(skip(frame), fields(width = frame.width, height = frame.height, format = ?frame.format))]
pub fn frame_to_rgba(frame: &Frame) -> Result<RgbaImage> {
    validate(frame)?;
    let stride = frame.bytes_per_row;
    let data = &frame.data;

    let rgba = match frame.format {
        PixelFormat::Bgra8 => RgbaImage::from_fn(frame.width, frame.height, |x, y| {
            let i = y as usize * stride + x as usize * 4;
            Rgba([data[i + 2], data[i + 1], data[i], data[i + 3]])
        }),
        PixelFormat::Nv12 => {
            let chroma = stride * frame.height as usize;
            RgbaImage::from_fn(frame.width, frame.height, |x, y| {
                let luma = data[y as usize * stride + x as usize] as f32;
                let c = chroma + (y as usize / 2) * stride + (x as usize / 2) * 2;
                let cb = data[c] as f32 - 128.0;
                let cr = data[c + 1] as f32 - 128.0;
                let r = luma + 1.402 * cr;
                let g = luma - 0.344_136 * cb - 0.714_136 * cr;
                let b = luma + 1.772 * cb;
                Rgba([clamp_u8(r), clamp_u8(g), clamp_u8(b), 255])
            })
        }
    };
    Ok(rgba)
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
