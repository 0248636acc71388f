// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the scanner UI.
//
// Every failure is translated at the boundary into an alert title, a plain
// message and a suggestion. The UI never sees a typed error.

use crate::error::DocscanError;
use crate::types::AccessStatus;

/// Guidance shown on the tips screen and referenced by the no-document alert.
pub const CAPTURE_TIPS: [&str; 4] = [
    "Place the document on top of a background of different color.",
    "Place the document in an area isolated from other rectangular shapes.",
    "Turn on the flash light in low light scenarios to reduce image noise.",
    "After turning on the flash light in low light scenarios, wait while aiming at the document a few seconds to let the camera adjust. Try again if the capture results in a dark image.",
];

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The live loop carries on; the next frame is a fresh attempt.
    Informational,
    /// The user must do something (move closer, change background, rename).
    ActionRequired,
    /// A feature (flash, camera) is unavailable; the session keeps going.
    FeatureUnavailable,
    /// Nothing works until the user changes a system setting.
    Terminal,
}

/// A human-readable error with an alert title, message and suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Alert heading.
    pub title: String,
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether simply trying again can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn new(
        title: &str,
        message: impl Into<String>,
        suggestion: impl Into<String>,
        retriable: bool,
        severity: Severity,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            suggestion: suggestion.into(),
            retriable,
            severity,
        }
    }
}

/// Convert a `DocscanError` into the message the UI collaborator shows.
pub fn humanize_error(err: &DocscanError) -> HumanError {
    match err {
        // -- Recognition --
        DocscanError::Recognition(_) => HumanError::new(
            "Document Recognition Error",
            "An error was encountered while performing recognition.",
            "Keep the camera pointed at the document. Detection will try again on the next frame.",
            true,
            Severity::Informational,
        ),

        DocscanError::NoDocumentDetected => HumanError::new(
            "No Object Detected",
            "We couldn't find the edges of a document in that photo.",
            format!(
                "Try moving the device away until all edges of the object are within view and a bounding box is shown. {}",
                CAPTURE_TIPS[0]
            ),
            true,
            Severity::ActionRequired,
        ),

        // -- Camera / device --
        DocscanError::DeviceNotSupported => HumanError::new(
            "Device Not Supported",
            "This device doesn't have a back camera the scanner can use.",
            "Try scanning on a different device.",
            false,
            Severity::FeatureUnavailable,
        ),

        DocscanError::CameraNotFound => HumanError::new(
            "Camera Not Found",
            "An error was encountered while trying to access the device built in camera.",
            "Close any other app using the camera, then return to this screen.",
            true,
            Severity::FeatureUnavailable,
        ),

        DocscanError::CameraConfiguration(_) => HumanError::new(
            "Camera Configuration Error",
            "An error was encountered while trying to configure the device built in camera.",
            "Return to this screen to try again. Restarting the device may solve this error.",
            true,
            Severity::FeatureUnavailable,
        ),

        DocscanError::Torch(detail) => {
            let locked = detail.to_ascii_lowercase().contains("lock");
            HumanError::new(
                "Flash Toggle Error",
                if locked {
                    "The system may have locked the flash light."
                } else {
                    "An error was encountered while accessing the flash light."
                },
                "Restarting the device may solve this error.",
                false,
                Severity::FeatureUnavailable,
            )
        }

        DocscanError::CameraAccess(status) => humanize_access(*status),

        // -- Document --
        DocscanError::ImageError(_) => HumanError::new(
            "Image Error",
            "There's a problem with this image.",
            "Try capturing the document again.",
            true,
            Severity::ActionRequired,
        ),

        DocscanError::PdfError(_) => HumanError::new(
            "Export Error",
            "The PDF couldn't be created.",
            "Try exporting as an image instead.",
            true,
            Severity::ActionRequired,
        ),

        DocscanError::Export(detail) => HumanError::new(
            "Export Error",
            "The scan couldn't be saved or shared.",
            format!("Try again, or choose a different destination. ({detail})"),
            true,
            Severity::ActionRequired,
        ),

        DocscanError::InvalidFileName(_) => HumanError::new(
            "Invalid File Name",
            "That file name can't be used.",
            "Enter a name without slashes, or leave it empty to use the date and time.",
            false,
            Severity::ActionRequired,
        ),

        // -- Configuration / session --
        DocscanError::Config(detail) => HumanError::new(
            "Settings Error",
            "The scanner settings are not valid.",
            format!("Default settings will be used. ({detail})"),
            false,
            Severity::Informational,
        ),

        DocscanError::SessionClosed => HumanError::new(
            "Scanner Closed",
            "The scanning session has ended.",
            "Open the scanner again to continue.",
            false,
            Severity::Informational,
        ),

        // -- Storage --
        DocscanError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "File Not Found",
                "The file or folder couldn't be found.",
                "It may have been moved or deleted. Try choosing the location again.",
                false,
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "Permission Denied",
                "The app doesn't have permission to write there.",
                "Try saving to a different location.",
                false,
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "Storage Error",
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, your device's storage may be full.",
                true,
                Severity::ActionRequired,
            ),
        },

        DocscanError::Serialization(_) => HumanError::new(
            "Internal Error",
            "The app had an internal data problem.",
            "Try again. If this keeps happening, please report it.",
            true,
            Severity::Informational,
        ),

        DocscanError::PlatformUnavailable => HumanError::new(
            "Not Available",
            "This feature isn't available on your device.",
            "Try saving the scan to a folder instead.",
            false,
            Severity::FeatureUnavailable,
        ),
    }
}

fn humanize_access(status: AccessStatus) -> HumanError {
    match status {
        AccessStatus::Restricted => HumanError::new(
            "Camera Restriction",
            "Unable to configure the camera session due to a device restriction.",
            "Ask whoever manages this device to allow camera access.",
            false,
            Severity::Terminal,
        ),
        AccessStatus::Denied => HumanError::new(
            "Enable Camera Access",
            "The scanner needs the camera to work.",
            "To scan, please enable camera access in Settings, then return to this screen.",
            false,
            Severity::Terminal,
        ),
        // Authorized / NotDetermined never reach here; treat as unknown.
        _ => HumanError::new(
            "Access Error",
            "An error was encountered while verifying camera access.",
            "Check camera access in Settings, then return to this screen.",
            false,
            Severity::Terminal,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_failure_is_informational() {
        let human = humanize_error(&DocscanError::Recognition("request failed".into()));
        assert_eq!(human.severity, Severity::Informational);
        assert!(human.retriable);
    }

    #[test]
    fn no_document_guides_the_user() {
        let human = humanize_error(&DocscanError::NoDocumentDetected);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert_eq!(human.title, "No Object Detected");
        assert!(human.suggestion.contains("background of different color"));
    }

    #[test]
    fn denied_access_is_terminal() {
        let human = humanize_error(&DocscanError::CameraAccess(AccessStatus::Denied));
        assert_eq!(human.severity, Severity::Terminal);
        assert!(human.suggestion.contains("Settings"));
        assert!(!human.retriable);
    }

    #[test]
    fn locked_torch_is_feature_unavailable() {
        let human = humanize_error(&DocscanError::Torch("configuration locked".into()));
        assert_eq!(human.severity, Severity::FeatureUnavailable);
        assert!(human.message.contains("locked"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = DocscanError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
