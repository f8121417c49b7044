//! Utilities for managing the per-run work directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, used to name the work directory.
pub fn run_stamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Prepare a work directory, removing it if it exists and creating it fresh.
///
/// Two runs started within the same second share a name; the later one
/// wins and starts from an empty directory.
pub fn prepare_work_dir(parent_dir: &Path, name: &str) -> Result<PathBuf> {
    let work_dir = parent_dir.join(name);

    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)
            .with_context(|| format!("Failed to remove stale {}", work_dir.display()))?;
    }

    fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    Ok(work_dir)
}
