// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use docscan_core::error::Result;

const APP_DIR: &str = "docscan";

/// Return the application data directory, creating it if needed.
///
/// An explicit override wins; otherwise `$XDG_DATA_HOME/docscan`, then
/// `~/.local/share/docscan`.
pub fn data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => base_dir(
            std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
        )
        .join(APP_DIR),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Where scanned documents are filed.
pub fn documents_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("Documents")
}

fn base_dir(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(xdg) = xdg.filter(|p| !p.as_os_str().is_empty()) {
        return xdg;
    }
    if let Some(home) = home {
        return home.join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let base = base_dir(Some("/xdg".into()), Some("/home/u".into()));
        assert_eq!(base, PathBuf::from("/xdg"));
        let base = base_dir(Some("".into()), Some("/home/u".into()));
        assert_eq!(base, PathBuf::from("/home/u/.local/share"));
    }

    #[test]
    fn override_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = data_dir(Some(&tmp.path().join("nested"))).unwrap();
        assert!(dir.is_dir());
        assert_eq!(documents_dir(&dir), dir.join("Documents"));
    }
}
