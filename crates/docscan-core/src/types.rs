// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docscan capture pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a scanning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Pixel layouts delivered by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit B, G, R, A interleaved.
    Bgra8,
    /// Bi-planar 4:2:0 full-range YCbCr: a full-resolution Y plane followed
    /// by an interleaved half-resolution CbCr plane.
    Nv12,
}

impl PixelFormat {
    /// Minimum row stride in bytes. NV12 planes share one stride, so an odd
    /// width still needs room for the last CbCr pair.
    pub fn min_bytes_per_row(&self, width: u32) -> usize {
        match self {
            Self::Bgra8 => width as usize * 4,
            Self::Nv12 => 2 * (width as usize).div_ceil(2),
        }
    }

    /// Total bytes needed for a tightly described buffer with the given stride.
    pub fn buffer_len(&self, height: u32, bytes_per_row: usize) -> usize {
        match self {
            Self::Bgra8 => bytes_per_row * height as usize,
            Self::Nv12 => bytes_per_row * (height as usize + (height as usize).div_ceil(2)),
        }
    }
}

/// Physical orientation of the device relative to the sensor's native
/// (landscape-left) buffer orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl DeviceOrientation {
    /// Whether the on-screen extent is the transpose of the buffer extent.
    pub fn is_portrait(&self) -> bool {
        matches!(self, Self::Portrait | Self::PortraitUpsideDown)
    }
}

/// How the camera image is fitted into the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreviewGravity {
    /// Stretch to fill, ignoring aspect ratio.
    Resize,
    /// Fit inside, preserving aspect ratio (letterbox).
    ResizeAspect,
    /// Cover the surface, preserving aspect ratio (centred crop).
    #[default]
    ResizeAspectFill,
}

/// One camera sample. Transient: produced and dropped at the source's rate.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bytes_per_row: usize,
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub orientation: DeviceOrientation,
}

impl Frame {
    /// Build a tightly packed frame stamped with the current time.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            bytes_per_row: format.min_bytes_per_row(width),
            data,
            timestamp: Utc::now(),
            orientation: DeviceOrientation::default(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// Camera devices
// ---------------------------------------------------------------------------

/// Kinds of back-facing camera a device may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraKind {
    Wide,
    UltraWide,
    /// A virtual device that fuses wide and telephoto/ultra-wide sensors.
    Dual,
}

/// A discovered camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub id: String,
    pub kind: CameraKind,
    pub has_torch: bool,
}

/// One capture format advertised by a camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFormat {
    pub id: String,
    pub video_width: u32,
    pub video_height: u32,
    pub still_width: u32,
    pub still_height: u32,
    pub max_frame_rate: f64,
    pub multi_cam_supported: bool,
    pub hdr_supported: bool,
    pub binned: bool,
}

impl CameraFormat {
    /// Whether the video stream has a 4:3 aspect ratio.
    pub fn is_four_by_three(&self) -> bool {
        self.video_width as u64 * 3 == self.video_height as u64 * 4
    }
}

/// Camera permission state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessStatus {
    Authorized,
    NotDetermined,
    Denied,
    Restricted,
    Unknown,
}

impl AccessStatus {
    /// Whether session configuration may proceed. An undetermined status
    /// proceeds because the platform prompts on first use.
    pub fn permits_configuration(&self) -> bool {
        matches!(self, Self::Authorized | Self::NotDetermined)
    }
}

/// Torch (continuous illumination) state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TorchMode {
    Off,
    On { level: f32 },
}

impl TorchMode {
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On { .. })
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Output encodings for a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ExportFormat {
    /// Single-page PDF.
    Pdf,
    Png,
    Jpeg { quality: u8 },
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// How a scan is laid out on a PDF page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageLayout {
    /// Page is exactly the size of the image at the export DPI.
    #[default]
    FitImage,
    /// Image is centred within the margins of a paper-sized page.
    Paper(PaperSize),
}

/// Folder a saved scan is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentCategory {
    Receipts,
    ContactCards,
    #[default]
    OtherDocuments,
    Custom(String),
}

impl DocumentCategory {
    pub fn folder_name(&self) -> &str {
        match self {
            Self::Receipts => "Receipts",
            Self::ContactCards => "Contact Cards",
            Self::OtherDocuments => "Other Documents",
            Self::Custom(name) => name,
        }
    }

    /// Parse a folder or keyword name. Unknown names become `Custom`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "receipts" => Self::Receipts,
            "contact cards" | "contact-cards" | "contacts" => Self::ContactCards,
            "other documents" | "other-documents" | "other" => Self::OtherDocuments,
            _ => Self::Custom(name.trim().to_string()),
        }
    }
}
