// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.
//
// Defaults carry the constants of the most recent scanner revision; earlier
// revisions' values survive only as named enhancement profiles.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DocscanError, Result};
use crate::types::{ExportFormat, PageLayout};

/// Persistent scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub enhancement: EnhancementConfig,
    pub export: ExportConfig,
    /// Torch level used when the flash button turns the torch on (0..=1).
    pub torch_level: f32,
    /// Detection results allowed to queue between the frame pump and the
    /// session state task before the pump blocks.
    pub frame_queue_depth: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            tracker: TrackerConfig::default(),
            enhancement: EnhancementConfig::default(),
            export: ExportConfig::default(),
            torch_level: 0.1,
            frame_queue_depth: 4,
        }
    }
}

/// Geometric constraints applied to rectangle candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lower bound on width / height of a candidate.
    pub min_aspect_ratio: f64,
    /// Upper bound on width / height of a candidate.
    pub max_aspect_ratio: f64,
    /// Shorter side of a candidate as a fraction of the frame's shorter side.
    pub min_size: f64,
    /// Candidates below this confidence are discarded.
    pub min_confidence: f32,
    /// At most this many observations are returned per frame.
    pub max_observations: usize,
    /// Longest side, in pixels, that frames are downscaled to before edge
    /// detection.
    pub working_resolution: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_aspect_ratio: 0.1,
            max_aspect_ratio: 4.0,
            min_size: 0.15,
            min_confidence: 1.0,
            max_observations: 1,
            working_resolution: 640,
        }
    }
}

/// Detection continuity settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive empty frames tolerated before the observation is cleared.
    pub miss_threshold: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { miss_threshold: 5 }
    }
}

/// Which enhancement profile is applied after perspective correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Name of a built-in profile (`standard`, `sharpened`, `gentle`) or
    /// `custom` to use [`EnhancementConfig::custom`].
    pub profile: String,
    pub custom: Option<EnhancementProfile>,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            profile: EnhancementProfile::STANDARD_NAME.into(),
            custom: None,
        }
    }
}

impl EnhancementConfig {
    /// Resolve the configured profile.
    pub fn resolve(&self) -> Result<EnhancementProfile> {
        if self.profile.eq_ignore_ascii_case("custom") {
            return self
                .custom
                .clone()
                .ok_or_else(|| DocscanError::Config("profile \"custom\" selected but no custom profile given".into()));
        }
        EnhancementProfile::named(&self.profile)
            .ok_or_else(|| DocscanError::Config(format!("unknown enhancement profile {:?}", self.profile)))
    }
}

/// Fixed enhancement parameters. Treated as configuration data, never
/// derived from image statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhancementProfile {
    /// Strength of the document (background normalisation) pass, 0..=1.
    pub document_amount: f32,
    /// Additive brightness in unit range (-1..=1); negative darkens.
    pub brightness: f32,
    /// Contrast multiplier around mid-grey.
    pub contrast: f32,
    pub sharpen: Option<Sharpening>,
}

/// Unsharp-mask parameters for the optional luminance sharpening pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl EnhancementProfile {
    pub const STANDARD_NAME: &'static str = "standard";

    pub const STANDARD: Self = Self {
        document_amount: 1.0,
        brightness: -0.2,
        contrast: 1.4,
        sharpen: None,
    };

    pub const SHARPENED: Self = Self {
        document_amount: 0.7,
        brightness: -0.35,
        contrast: 1.5,
        sharpen: Some(Sharpening {
            sigma: 1.0,
            threshold: 2,
        }),
    };

    pub const GENTLE: Self = Self {
        document_amount: 0.9,
        brightness: -0.25,
        contrast: 1.2,
        sharpen: None,
    };

    /// The built-in profile table.
    pub fn builtin() -> [(&'static str, Self); 3] {
        [
            (Self::STANDARD_NAME, Self::STANDARD),
            ("sharpened", Self::SHARPENED),
            ("gentle", Self::GENTLE),
        ]
    }

    /// Look up a built-in profile by name (case-insensitive).
    pub fn named(name: &str) -> Option<Self> {
        Self::builtin()
            .into_iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, p)| p)
    }
}

impl Default for EnhancementProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Export defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub default_format: ExportFormat,
    pub jpeg_quality: u8,
    pub page_layout: PageLayout,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: ExportFormat::Pdf,
            jpeg_quality: 90,
            page_layout: PageLayout::FitImage,
        }
    }
}

impl ScannerConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        debug!(path = %path.as_ref().display(), "scanner config loaded");
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        info!(path = %path.as_ref().display(), "scanner config saved");
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if !(d.min_aspect_ratio > 0.0 && d.min_aspect_ratio <= d.max_aspect_ratio) {
            return Err(DocscanError::Config(format!(
                "aspect ratio bounds [{}, {}] are invalid",
                d.min_aspect_ratio, d.max_aspect_ratio
            )));
        }
        if !(d.min_size > 0.0 && d.min_size <= 1.0) {
            return Err(DocscanError::Config(format!(
                "minimum size {} must be in (0, 1]",
                d.min_size
            )));
        }
        if d.max_observations == 0 {
            return Err(DocscanError::Config("max_observations must be at least 1".into()));
        }
        if d.working_resolution < 64 {
            return Err(DocscanError::Config(format!(
                "working resolution {} is too small",
                d.working_resolution
            )));
        }
        if self.tracker.miss_threshold == 0 {
            return Err(DocscanError::Config("miss_threshold must be at least 1".into()));
        }
        let check_quality = |quality: u8| {
            if (1..=100).contains(&quality) {
                Ok(())
            } else {
                Err(DocscanError::Config(format!(
                    "JPEG quality {quality} must be in 1..=100"
                )))
            }
        };
        check_quality(self.export.jpeg_quality)?;
        if let ExportFormat::Jpeg { quality } = self.export.default_format {
            check_quality(quality)?;
        }
        if !(0.0..=1.0).contains(&self.torch_level) || self.torch_level == 0.0 {
            return Err(DocscanError::Config(format!(
                "torch level {} must be in (0, 1]",
                self.torch_level
            )));
        }
        if self.frame_queue_depth == 0 {
            return Err(DocscanError::Config("frame_queue_depth must be at least 1".into()));
        }
        self.enhancement.resolve()?;
        Ok(())
    }
}
