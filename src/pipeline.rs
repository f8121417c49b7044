//! End-to-end check of one rootfs image.
//!
//! Stages run strictly in order; each needs the previous one's output:
//!
//! 1. Locate and fingerprint the image (missing image stops here, before
//!    anything but the log exists in the output directory)
//! 2. Record build context: `BR2_*` environment and Buildroot configs
//! 3. Extract: image -> volume -> file tree -> rootfs root
//! 4. Evaluate the checklist
//! 5. Write reports and append the summary to the log
//!
//! Fatal stages return a [`PipelineError`]; failed checks do not, they
//! come back in the [`RunOutcome`].

use anyhow::Context;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::buildroot::{build_env, BuildrootContext};
use crate::checks::{evaluate_all, ChecklistReport, OPTIONAL_PRESENCE, REQUIRED_CHECKS};
use crate::common::{prepare_work_dir, run_stamp};
use crate::config::Config;
use crate::error::{PipelineError, EXIT_CHECKS_FAILED, EXIT_OK};
use crate::extract::{extract_rootfs, Extractor};
use crate::image::locate_image;
use crate::report::{self, ReportPaths, RunRecord};
use crate::runlog::RunLog;

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub rootfs_img: PathBuf,
    pub outdir: PathBuf,
    /// Searched for Buildroot `.config` files.
    pub workspace: PathBuf,
    pub config: Config,
}

/// A run that got as far as evaluating the checklist.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub outdir: PathBuf,
    pub paths: ReportPaths,
    pub checklist: ChecklistReport,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.checklist.all_passed()
    }

    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            EXIT_OK
        } else {
            EXIT_CHECKS_FAILED
        }
    }

    /// The one line printed to stdout at the end of a run.
    pub fn message(&self) -> String {
        if self.passed() {
            format!(
                "OK: rootfs sanity checks passed; reports in {}",
                self.outdir.display()
            )
        } else {
            format!(
                "ERROR: required rootfs components missing; see {} and {}",
                self.paths.summary.display(),
                self.paths.log.display()
            )
        }
    }
}

/// Absolute form of `path`, canonical when it already exists.
fn resolve_path(path: &Path) -> anyhow::Result<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Ok(canonical);
    }
    let cwd = env::current_dir().context("Cannot determine current directory")?;
    Ok(cwd.join(path))
}

/// Run every stage for `opts`, extracting with `extractor`.
pub fn run(opts: &RunOptions, extractor: &dyn Extractor) -> Result<RunOutcome, PipelineError> {
    let outdir = opts.outdir.as_path();
    fs::create_dir_all(outdir)
        .with_context(|| format!("Failed to create output directory {}", outdir.display()))?;
    let outdir = resolve_path(outdir)?;
    let rootfs_img = resolve_path(&opts.rootfs_img)?;
    let workspace = resolve_path(&opts.workspace)?;

    let paths = ReportPaths::in_dir(&outdir);
    let mut log = RunLog::create(&paths.log)?;
    let workdir_name = format!("work_{}", run_stamp());

    log.line("ubicheck")?;
    log.line(format!("rootfs_img={}", rootfs_img.display()))?;
    log.line(format!("outdir={}", outdir.display()))?;
    log.line(format!("workdir={}", outdir.join(&workdir_name).display()))?;
    log.line(format!("workspace={}", workspace.display()))?;

    let result = run_stages(
        &rootfs_img,
        &outdir,
        &workdir_name,
        &workspace,
        &opts.config,
        &paths,
        extractor,
        &mut log,
    );

    match result {
        Ok(checklist) => Ok(RunOutcome {
            outdir,
            paths,
            checklist,
        }),
        Err(e) => {
            log.error(format!("{:#}", e))?;
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_stages(
    rootfs_img: &Path,
    outdir: &Path,
    workdir_name: &str,
    workspace: &Path,
    config: &Config,
    paths: &ReportPaths,
    extractor: &dyn Extractor,
    log: &mut RunLog,
) -> Result<ChecklistReport, PipelineError> {
    let image = locate_image(rootfs_img)?;
    let workdir = prepare_work_dir(outdir, workdir_name)?;

    let env = build_env(&config.env, &config.env_prefix);
    let buildroot = BuildrootContext::collect(workspace);

    let extraction = extract_rootfs(extractor, &image.path, &workdir, log)?;
    log.line(format!("extracted_dir={}", extraction.extracted_dir.display()))?;
    log.line(format!("rootfs_root={}", extraction.rootfs_root.display()))?;

    eprintln!("Checking {}...", extraction.rootfs_root.display());
    let checklist = evaluate_all(&extraction.rootfs_root, REQUIRED_CHECKS, OPTIONAL_PRESENCE);

    let record = RunRecord {
        image,
        volume: extraction.volume,
        rootfs_root: extraction.rootfs_root,
        checklist,
        buildroot,
        env,
    };
    let summary = report::write_all(paths, &record)?;

    log.raw("\n=== SUMMARY ===\n")?;
    log.raw(&summary)?;
    log.raw("\n=== END ===\n")?;
    log.flush()?;

    Ok(record.checklist)
}
