//! The per-run `check.log` audit trail.
//!
//! Everything the run does is appended here as it happens: a header with
//! the resolved inputs, each external command line, the command's combined
//! output, `ERROR:` lines for fatal stages, and finally the summary.
//! Writes go straight to the file so a hung extractor still leaves a
//! readable log behind.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Create (truncate) the log file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one line.
    pub fn line(&mut self, msg: impl AsRef<str>) -> Result<()> {
        writeln!(self.file, "{}", msg.as_ref())
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Append text verbatim (captured tool output keeps its own newlines).
    pub fn raw(&mut self, text: impl AsRef<str>) -> Result<()> {
        self.file
            .write_all(text.as_ref().as_bytes())
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Echo a command line the way a shell transcript would.
    pub fn command(&mut self, display: &str) -> Result<()> {
        self.raw(format!("\n$ {}\n", display))?;
        self.flush()
    }

    pub fn error(&mut self, msg: impl AsRef<str>) -> Result<()> {
        self.line(format!("ERROR: {}", msg.as_ref()))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))
    }
}
