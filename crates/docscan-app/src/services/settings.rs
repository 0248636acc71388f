// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner settings loading.

use std::path::{Path, PathBuf};

use docscan_core::config::ScannerConfig;
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// Default settings file inside the data directory.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Load settings from `path`. A missing file means defaults; an unreadable
/// or invalid one is logged and replaced by defaults.
pub fn load_config(path: &Path) -> ScannerConfig {
    if !path.exists() {
        info!(path = %path.display(), "No config file, using defaults");
        return ScannerConfig::default();
    }
    match ScannerConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Config unusable, using defaults");
            ScannerConfig::default()
        }
    }
}
