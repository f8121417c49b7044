//! Two-step UBI/UBIFS extraction.
//!
//! The image is copied into the run's work directory first; ubireader
//! writes its output relative to the current directory and next to the
//! input file, and none of that may leak into the caller's tree.
//!
//! Step 1 turns the UBI container into one or more volume files, step 2
//! turns the chosen volume into a directory tree. Neither step's output
//! layout is documented, so two heuristics bridge the gaps:
//!
//! - [`largest_file`]: the rootfs volume is the biggest file step 1 wrote.
//! - [`find_rootfs_root`]: the real `/` is the shallowest directory in the
//!   step 2 output that has an init or a busybox in it.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::common::exists_in_root;
use crate::error::PipelineError;
use crate::image::FileFingerprint;
use crate::process::{self, Cmd};
use crate::runlog::RunLog;

/// Any of these under a directory marks it as the rootfs top.
pub const ROOT_MARKERS: &[&str] = &["sbin/init", "bin/busybox", "usr/bin/busybox"];

/// Where step 2 writes the extracted tree, relative to the work directory.
pub const EXTRACTED_DIR: &str = "extracted_rootfs";

/// A UBI/UBIFS extraction backend.
///
/// Both operations return the tool's exit code; `Err` is reserved for
/// failing to run the tool at all.
pub trait Extractor {
    /// Name of the step 1 tool, used in log and error messages.
    fn images_tool(&self) -> &str;

    /// Name of the step 2 tool, used in log and error messages.
    fn files_tool(&self) -> &str;

    /// Directory step 1 writes volume files into.
    fn images_dir(&self, workdir: &Path) -> PathBuf {
        workdir.join("ubifs-root")
    }

    /// Step 1: UBI container -> volume files under [`Extractor::images_dir`].
    fn extract_images(&self, image: &Path, workdir: &Path, log: &mut RunLog) -> Result<i32>;

    /// Step 2: a single volume file -> directory tree in `dest`.
    fn extract_files(
        &self,
        volume: &Path,
        dest: &Path,
        workdir: &Path,
        log: &mut RunLog,
    ) -> Result<i32>;
}

/// The `ubireader` Python package.
///
/// Uses the `ubireader_extract_*` console scripts when they are on PATH,
/// otherwise runs the script modules through the configured interpreter.
#[derive(Debug, Clone)]
pub struct UbiReader {
    python: String,
}

impl UbiReader {
    pub const EXTRACT_IMAGES: &'static str = "ubireader_extract_images";
    pub const EXTRACT_FILES: &'static str = "ubireader_extract_files";

    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn script(&self, name: &str) -> Cmd {
        match process::which(name) {
            Some(path) => Cmd::new(path.to_string_lossy()),
            None => Cmd::new(&self.python).args(["-m", &format!("ubireader.scripts.{}", name)]),
        }
    }
}

impl Extractor for UbiReader {
    fn images_tool(&self) -> &str {
        Self::EXTRACT_IMAGES
    }

    fn files_tool(&self) -> &str {
        Self::EXTRACT_FILES
    }

    fn extract_images(&self, image: &Path, workdir: &Path, log: &mut RunLog) -> Result<i32> {
        self.script(Self::EXTRACT_IMAGES)
            .arg_path(image)
            .dir(workdir)
            .run_logged(log)
    }

    fn extract_files(
        &self,
        volume: &Path,
        dest: &Path,
        workdir: &Path,
        log: &mut RunLog,
    ) -> Result<i32> {
        self.script(Self::EXTRACT_FILES)
            .arg_path(volume)
            .arg("-o")
            .arg_path(dest)
            .dir(workdir)
            .run_logged(log)
    }
}

/// What the two extraction steps produced.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The volume chosen for step 2.
    pub volume: FileFingerprint,
    /// Top of the step 2 output.
    pub extracted_dir: PathBuf,
    /// The directory checks are evaluated against.
    pub rootfs_root: PathBuf,
}

/// Run both extraction steps for `image` inside `workdir`.
pub fn extract_rootfs(
    extractor: &dyn Extractor,
    image: &Path,
    workdir: &Path,
    log: &mut RunLog,
) -> Result<Extraction, PipelineError> {
    let file_name = image
        .file_name()
        .with_context(|| format!("Image path has no file name: {}", image.display()))?;
    let local_image = workdir.join(file_name);
    fs::copy(image, &local_image).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            image.display(),
            local_image.display()
        )
    })?;

    eprintln!("Extracting UBI volumes from {}...", image.display());
    let code = stage_code(extractor.extract_images(&local_image, workdir, log), log)?;
    if code != 0 {
        return Err(PipelineError::ExtractImagesFailed {
            tool: extractor.images_tool().to_string(),
            code,
        });
    }

    let images_dir = extractor.images_dir(workdir);
    if !images_dir.exists() {
        return Err(PipelineError::ImagesDirMissing(images_dir));
    }

    let volume_path =
        largest_file(&images_dir).ok_or_else(|| PipelineError::NoVolumeFile(images_dir.clone()))?;
    let volume = FileFingerprint::of(&volume_path)?;

    let extracted_dir = workdir.join(EXTRACTED_DIR);
    fs::create_dir_all(&extracted_dir)
        .with_context(|| format!("Failed to create {}", extracted_dir.display()))?;

    eprintln!("Extracting files from {}...", volume_path.display());
    let code = stage_code(
        extractor.extract_files(&volume_path, &extracted_dir, workdir, log),
        log,
    )?;
    if code != 0 {
        return Err(PipelineError::ExtractFilesFailed {
            tool: extractor.files_tool().to_string(),
            code,
        });
    }

    let rootfs_root = find_rootfs_root(&extracted_dir);

    Ok(Extraction {
        volume,
        extracted_dir,
        rootfs_root,
    })
}

/// A tool that could not be started counts as a failed stage (rc -1).
fn stage_code(result: Result<i32>, log: &mut RunLog) -> Result<i32> {
    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            log.error(format!("{:#}", e))?;
            Ok(-1)
        }
    }
}

/// Largest regular file under `dir`, walked in lexical order.
///
/// Ties go to the first file seen. Entries that cannot be stat'ed are
/// skipped.
pub fn largest_file(dir: &Path) -> Option<PathBuf> {
    let mut largest: Option<(u64, PathBuf)> = None;
    for entry in WalkDir::new(dir).sort_by_file_name().into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let size = meta.len();
        if largest.as_ref().map_or(true, |(best, _)| size > *best) {
            largest = Some((size, entry.into_path()));
        }
    }
    largest.map(|(_, path)| path)
}

/// Locate the directory that looks like `/` inside an extracted tree.
///
/// Candidates are `top` and every directory below it, shallowest first and
/// lexical within a depth. The first one containing any of
/// [`ROOT_MARKERS`] wins; with no match, `top` itself is returned.
pub fn find_rootfs_root(top: &Path) -> PathBuf {
    let mut candidates: Vec<(usize, PathBuf)> = WalkDir::new(top)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_dir())
        .map(|e| (e.depth(), e.into_path()))
        .collect();
    candidates.sort_by_key(|(depth, _)| *depth);

    candidates
        .into_iter()
        .map(|(_, dir)| dir)
        .find(|dir| ROOT_MARKERS.iter().any(|m| exists_in_root(dir, m)))
        .unwrap_or_else(|| top.to_path_buf())
}
