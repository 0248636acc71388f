// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docscan.

use thiserror::Error;

use crate::types::AccessStatus;

/// Top-level error type for all Docscan operations.
#[derive(Debug, Error)]
pub enum DocscanError {
    // -- Recognition --
    #[error("rectangle recognition failed: {0}")]
    Recognition(String),

    #[error("no document detected")]
    NoDocumentDetected,

    // -- Camera / device --
    #[error("device not supported: no usable back camera")]
    DeviceNotSupported,

    #[error("camera not found")]
    CameraNotFound,

    #[error("camera configuration failed: {0}")]
    CameraConfiguration(String),

    #[error("torch toggle failed: {0}")]
    Torch(String),

    #[error("camera access unavailable: {0:?}")]
    CameraAccess(AccessStatus),

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),

    // -- Configuration / session --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("scanning session is closed")]
    SessionClosed,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocscanError>;
