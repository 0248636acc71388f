// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where no native camera stack is wired in.
//
// Every capability returns `PlatformUnavailable`; the device has no torch and
// camera access is reported as unknown.

use docscan_core::error::{DocscanError, Result};
use docscan_core::types::{AccessStatus, CameraDevice, CameraFormat, Frame, TorchMode};

use crate::traits::*;

/// No-op bridge returned when the host provides no camera.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativeCamera for StubBridge {
    fn open_frame_source(
        &self,
        _device: &CameraDevice,
        _format: Option<&CameraFormat>,
    ) -> Result<Box<dyn FrameSource>> {
        tracing::warn!("NativeCamera::open_frame_source called on stub bridge");
        Err(DocscanError::PlatformUnavailable)
    }

    fn capture_still(&self) -> Result<Frame> {
        tracing::warn!("NativeCamera::capture_still called on stub bridge");
        Err(DocscanError::PlatformUnavailable)
    }
}

impl NativeTorch for StubBridge {
    fn has_torch(&self) -> bool {
        false
    }

    fn torch_mode(&self) -> TorchMode {
        TorchMode::Off
    }

    fn set_torch(&self, _mode: TorchMode) -> Result<()> {
        Err(DocscanError::PlatformUnavailable)
    }
}

impl NativeCameraAccess for StubBridge {
    fn camera_access(&self) -> AccessStatus {
        AccessStatus::Unknown
    }
}

impl NativeDeviceDiscovery for StubBridge {
    fn back_cameras(&self) -> Result<Vec<CameraDevice>> {
        Err(DocscanError::PlatformUnavailable)
    }

    fn formats(&self, _device: &CameraDevice) -> Result<Vec<CameraFormat>> {
        Err(DocscanError::PlatformUnavailable)
    }

    fn multi_cam_supported(&self) -> bool {
        false
    }
}

impl NativeShare for StubBridge {
    fn share_document(&self, _document: &[u8], _mime_type: &str, _file_name: &str) -> Result<()> {
        tracing::warn!("NativeShare::share_document called on stub bridge");
        Err(DocscanError::PlatformUnavailable)
    }
}
