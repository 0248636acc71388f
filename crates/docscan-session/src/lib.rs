// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-session: the live scanning session.
//
// Ties a platform bridge and a rectangle detector into a running session:
// camera configuration, detection continuity tracking, overlay coordinate
// mapping, torch control and the capture pipeline.

pub mod capture;
pub mod configure;
pub mod mapper;
pub mod session;
pub mod torch;
pub mod tracker;

pub use capture::{CapturePipeline, CaptureReport, ObservationSource, ShareSink};
pub use configure::{CameraLayout, SessionConfiguration, configure};
pub use mapper::{CoordinateMapper, map_to_screen, orientation_transform};
pub use session::{SessionEvent, SessionHandle, SessionLifecycle};
pub use torch::{TorchController, TorchGuard};
pub use tracker::{DetectionTracker, TrackerState, TrackerTransition};
