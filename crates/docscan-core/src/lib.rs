// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docscan: core types, geometry and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod human_errors;
pub mod types;

pub use config::ScannerConfig;
pub use error::DocscanError;
pub use geometry::{AffineTransform, Point, Quad, RectangleObservation, Size};
pub use types::*;
