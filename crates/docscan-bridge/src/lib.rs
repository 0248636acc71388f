// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docscan: platform camera bridge abstractions.
//
// The capture pipeline talks to the camera, torch, permission system and
// share sheet only through the traits in `traits`. Native glue on each
// platform implements them; `stub` stands in on desktop/CI and `replay`
// drives the pipeline from image files.

pub mod replay;
pub mod stub;
pub mod traits;

pub use replay::{ReplayBridge, ReplayFrameSource, frame_from_image};
pub use stub::StubBridge;
pub use traits::*;
