//! Run artifacts written to the output directory.
//!
//! ```text
//! <outdir>/
//! ├── check.log              # command echoes + tool output + summary
//! ├── summary.txt            # human-readable verdict
//! ├── required_checks.json   # every CheckResult + optional presence
//! ├── tree_snippets.txt      # file listing for diffing builds
//! ├── meta.json              # hashes, sizes, env, config grep
//! └── work_<unix-seconds>/   # disposable extraction workspace
//! ```

pub mod meta;
pub mod summary;
pub mod tree;

pub use meta::RunMetadata;
pub use summary::render_summary;
pub use tree::tree_snippets;

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::buildroot::BuildrootContext;
use crate::checks::ChecklistReport;
use crate::common::write_file_with_dirs;
use crate::image::FileFingerprint;

/// Fixed artifact locations inside the output directory.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub log: PathBuf,
    pub summary: PathBuf,
    pub checks: PathBuf,
    pub snippets: PathBuf,
    pub meta: PathBuf,
}

impl ReportPaths {
    pub fn in_dir(outdir: &Path) -> Self {
        Self {
            log: outdir.join("check.log"),
            summary: outdir.join("summary.txt"),
            checks: outdir.join("required_checks.json"),
            snippets: outdir.join("tree_snippets.txt"),
            meta: outdir.join("meta.json"),
        }
    }
}

/// Everything a completed run knows, as input to the report writers.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub image: FileFingerprint,
    pub volume: FileFingerprint,
    pub rootfs_root: PathBuf,
    pub checklist: ChecklistReport,
    pub buildroot: BuildrootContext,
    pub env: BTreeMap<String, String>,
}

/// Write `required_checks.json`.
pub fn write_checks(path: &Path, checklist: &ChecklistReport) -> Result<()> {
    let json = serde_json::to_string_pretty(checklist).context("Failed to serialize checks")?;
    write_file_with_dirs(path, json)
}

/// Write `meta.json`.
pub fn write_meta(path: &Path, record: &RunRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunMetadata::from_record(record))
        .context("Failed to serialize metadata")?;
    write_file_with_dirs(path, json)
}

/// Write every artifact except the log, returning the summary text.
pub fn write_all(paths: &ReportPaths, record: &RunRecord) -> Result<String> {
    write_file_with_dirs(&paths.snippets, tree_snippets(&record.rootfs_root))?;
    write_checks(&paths.checks, &record.checklist)?;
    let summary = render_summary(record);
    write_file_with_dirs(&paths.summary, &summary)?;
    write_meta(&paths.meta, record)?;
    Ok(summary)
}
