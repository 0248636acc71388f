// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: camera frame decoding and per-pixel adjustments.

pub mod frame;
pub mod processor;

pub use frame::{frame_to_luma, frame_to_rgba};
pub use processor::ImageProcessor;
