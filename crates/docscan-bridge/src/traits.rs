// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native camera capabilities.

use std::time::Duration;

use docscan_core::error::Result;
use docscan_core::types::{AccessStatus, CameraDevice, CameraFormat, Frame, TorchMode};

/// Unified bridge that groups every native capability the scanner uses.
///
/// Platforms that lack a capability return
/// `DocscanError::PlatformUnavailable` from that method.
pub trait PlatformBridge:
    NativeCamera + NativeTorch + NativeCameraAccess + NativeDeviceDiscovery + NativeShare + Send + Sync
{
    /// Human-readable platform name (e.g. "iOS 17", "Replay").
    fn platform_name(&self) -> &str;
}

/// A continuous sequence of preview frames.
///
/// `next_frame` blocks until the next frame is available and returns
/// `Ok(None)` once the stream has ended.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Nominal time between frames.
    fn frame_interval(&self) -> Duration;
}

/// Preview frames and high-resolution stills from a back camera.
pub trait NativeCamera {
    /// Start streaming preview frames from `device` in `format` (or the
    /// device's default format).
    fn open_frame_source(
        &self,
        device: &CameraDevice,
        format: Option<&CameraFormat>,
    ) -> Result<Box<dyn FrameSource>>;

    /// Request exactly one still at the highest available quality.
    fn capture_still(&self) -> Result<Frame>;
}

/// Continuous illumination.
pub trait NativeTorch {
    fn has_torch(&self) -> bool;

    fn torch_mode(&self) -> TorchMode;

    /// Lock the device configuration and apply `mode`.
    fn set_torch(&self, mode: TorchMode) -> Result<()>;
}

/// Camera permission.
pub trait NativeCameraAccess {
    fn camera_access(&self) -> AccessStatus;
}

/// Back-camera discovery.
pub trait NativeDeviceDiscovery {
    /// Back-facing cameras, in the platform's preference order.
    fn back_cameras(&self) -> Result<Vec<CameraDevice>>;

    /// Capture formats offered by a device.
    fn formats(&self, device: &CameraDevice) -> Result<Vec<CameraFormat>>;

    /// Whether several cameras can stream at once.
    fn multi_cam_supported(&self) -> bool;
}

/// Share content via the OS share sheet.
pub trait NativeShare {
    /// Present the share sheet for a finished document.
    fn share_document(&self, document: &[u8], mime_type: &str, file_name: &str) -> Result<()>;
}
