//! Fatal pipeline outcomes.
//!
//! Each stage that can abort a run has its own variant so `main` can map
//! it to a distinct process exit code. Check failures are NOT errors: they
//! are reported in full and only collapse into [`EXIT_CHECKS_FAILED`].

use std::path::PathBuf;
use thiserror::Error;

/// All required checks passed.
pub const EXIT_OK: u8 = 0;
/// Unexpected I/O or setup failure.
pub const EXIT_INTERNAL: u8 = 1;
/// Extraction worked but at least one required check failed.
pub const EXIT_CHECKS_FAILED: u8 = 10;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("rootfs image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("{tool} failed rc={code}")]
    ExtractImagesFailed { tool: String, code: i32 },

    #[error("{} not found after extraction", .0.display())]
    ImagesDirMissing(PathBuf),

    #[error("could not find extracted volume file under {}", .0.display())]
    NoVolumeFile(PathBuf),

    #[error("{tool} failed rc={code}")]
    ExtractFilesFailed { tool: String, code: i32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::ImageNotFound(_) => 2,
            PipelineError::ExtractImagesFailed { .. } => 3,
            PipelineError::ImagesDirMissing(_) => 4,
            PipelineError::NoVolumeFile(_) => 5,
            PipelineError::ExtractFilesFailed { .. } => 6,
            PipelineError::Other(_) => EXIT_INTERNAL,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Other(err.into())
    }
}
