// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: rectangle detection, perspective correction and
// enhancement.

pub mod detect;
pub mod enhance;
pub mod perspective;

pub use detect::{ContourRectangleDetector, RectangleDetector};
pub use enhance::ImageEnhancer;
pub use perspective::{CapturedStill, CorrectedDocumentImage, PerspectiveCorrector};
