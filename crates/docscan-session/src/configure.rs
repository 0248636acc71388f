// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Camera session configuration: device discovery, access check and capture
// format selection.

use docscan_bridge::{NativeCameraAccess, NativeDeviceDiscovery, PlatformBridge};
use docscan_core::error::{DocscanError, Result};
use docscan_core::types::{AccessStatus, CameraDevice, CameraFormat, CameraKind};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Still resolution preferred for the wide camera.
const PREFERRED_STILL: (u32, u32) = (4032, 3024);
const PREFERRED_FRAME_RATE: f64 = 60.0;

/// Which back cameras the session streams from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CameraLayout {
    Single {
        wide: CameraDevice,
    },
    MultiCam {
        wide: CameraDevice,
        ultra_wide: Option<CameraDevice>,
    },
}

impl CameraLayout {
    /// The camera that feeds detection and stills.
    pub fn wide(&self) -> &CameraDevice {
        match self {
            Self::Single { wide } | Self::MultiCam { wide, .. } => wide,
        }
    }

    pub fn is_multi_cam(&self) -> bool {
        matches!(self, Self::MultiCam { .. })
    }
}

/// Result of configuring a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfiguration {
    pub layout: CameraLayout,
    /// Chosen wide-camera format. `None` keeps the device default.
    pub wide_format: Option<CameraFormat>,
    pub ultra_wide_format: Option<CameraFormat>,
}

/// Fail with `CameraAccess` unless configuration may proceed.
pub fn check_access(status: AccessStatus) -> Result<()> {
    if status.permits_configuration() {
        Ok(())
    } else {
        Err(DocscanError::CameraAccess(status))
    }
}

/// Choose the camera layout from the discovered back cameras.
///
/// A wide camera is required. A dual camera on hardware that can stream
/// several cameras at once selects the multi-cam layout.
pub fn discover_layout(cameras: &[CameraDevice], multi_cam_supported: bool) -> Result<CameraLayout> {
    let find = |kind: CameraKind| cameras.iter().find(|c| c.kind == kind).cloned();

    let wide = find(CameraKind::Wide).ok_or(DocscanError::DeviceNotSupported)?;
    let has_dual = cameras.iter().any(|c| c.kind == CameraKind::Dual);

    if has_dual && multi_cam_supported {
        Ok(CameraLayout::MultiCam {
            wide,
            ultra_wide: find(CameraKind::UltraWide),
        })
    } else {
        Ok(CameraLayout::Single { wide })
    }
}

/// Pick the wide-camera format for multi-cam streaming.
///
/// Tiers, first match wins: 4:3 video with a 4032×3024 still at 60 fps and
/// HDR; the same without the frame-rate requirement; any 4:3 format.
pub fn select_wide_format(formats: &[CameraFormat]) -> Option<CameraFormat> {
    let candidates: Vec<&CameraFormat> = formats
        .iter()
        .filter(|f| f.multi_cam_supported && f.is_four_by_three())
        .collect();
    let full_still =
        |f: &&CameraFormat| (f.still_width, f.still_height) == PREFERRED_STILL && f.hdr_supported;

    candidates
        .iter()
        .find(|f| full_still(f) && (f.max_frame_rate - PREFERRED_FRAME_RATE).abs() < 0.5)
        .or_else(|| candidates.iter().find(|f| full_still(f)))
        .or_else(|| candidates.first())
        .map(|f| (*f).clone())
}

/// Pick the ultra-wide format: multi-cam, 4:3 and binned. The last match in
/// the device's list wins.
pub fn select_ultra_wide_format(formats: &[CameraFormat]) -> Option<CameraFormat> {
    formats
        .iter()
        .filter(|f| f.multi_cam_supported && f.is_four_by_three() && f.binned)
        .last()
        .cloned()
}

/// Discover cameras, verify access and choose formats.
///
/// Access is checked after discovery; a denied or restricted status skips
/// configuration entirely.
#[instrument(skip(bridge), fields(platform = bridge.platform_name()))]
pub fn configure(bridge: &dyn PlatformBridge) -> Result<SessionConfiguration> {
    let cameras = bridge.back_cameras()?;
    if cameras.is_empty() {
        return Err(DocscanError::DeviceNotSupported);
    }
    let layout = discover_layout(&cameras, bridge.multi_cam_supported())?;
    check_access(bridge.camera_access())?;

    let (wide_format, ultra_wide_format) = match &layout {
        CameraLayout::Single { .. } => (None, None),
        CameraLayout::MultiCam { wide, ultra_wide } => {
            let wide_format = select_wide_format(&bridge.formats(wide)?);
            if wide_format.is_none() {
                warn!(device = %wide.id, "No 4:3 multi-cam format, keeping default");
            }
            let ultra_wide_format = match ultra_wide {
                Some(device) => select_ultra_wide_format(&bridge.formats(device)?),
                None => None,
            };
            (wide_format, ultra_wide_format)
        }
    };

    info!(
        multi_cam = layout.is_multi_cam(),
        wide = %layout.wide().id,
        wide_format = wide_format.as_ref().map(|f| f.id.as_str()),
        "Camera session configured"
    );
    Ok(SessionConfiguration {
        layout,
        wide_format,
        ultra_wide_format,
    })
}
