//! Input image lookup and fingerprinting.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::sha256_file;
use crate::error::PipelineError;

/// Size and content hash of a file that went into the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl FileFingerprint {
    /// Stat and hash `path`.
    pub fn of(path: &Path) -> anyhow::Result<Self> {
        let meta = fs::metadata(path).with_context(|| format!("Cannot stat {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
            sha256: sha256_file(path)?,
        })
    }
}

/// Locate the rootfs image; a missing file is its own pipeline outcome.
pub fn locate_image(path: &Path) -> Result<FileFingerprint, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::ImageNotFound(path.to_path_buf()));
    }
    Ok(FileFingerprint::of(path)?)
}
