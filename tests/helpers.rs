//! Shared test utilities for ubicheck tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use ubicheck::config::Config;
use ubicheck::extract::Extractor;
use ubicheck::pipeline::RunOptions;
use ubicheck::runlog::RunLog;

/// Test environment with temporary input, output and workspace directories.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Where the input image lives
    pub input: PathBuf,
    /// Output directory handed to the run
    pub outdir: PathBuf,
    /// Workspace searched for Buildroot configs
    pub workspace: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with temporary directories.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let input = base.join("input");
        let outdir = base.join("out");
        let workspace = base.join("workspace");

        fs::create_dir_all(&input).expect("Failed to create input dir");
        fs::create_dir_all(&workspace).expect("Failed to create workspace dir");

        Self {
            _temp_dir: temp_dir,
            input,
            outdir,
            workspace,
        }
    }

    /// Write a fake UBI image and return its path.
    pub fn image(&self) -> PathBuf {
        let path = self.input.join("rootfs.img");
        fs::write(&path, b"UBI#\x01\x00\x00\x00fake-ubi-image").expect("Failed to write image");
        path
    }

    pub fn options(&self, rootfs_img: PathBuf) -> RunOptions {
        self.options_with_env(rootfs_img, Vec::new())
    }

    pub fn options_with_env(&self, rootfs_img: PathBuf, vars: Vec<(&str, &str)>) -> RunOptions {
        RunOptions {
            rootfs_img,
            outdir: self.outdir.clone(),
            workspace: self.workspace.clone(),
            config: Config::from_vars(
                vars.into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            ),
        }
    }

    pub fn read_out(&self, name: &str) -> String {
        fs::read_to_string(self.outdir.join(name))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", name, e))
    }

    pub fn read_json(&self, name: &str) -> serde_json::Value {
        serde_json::from_str(&self.read_out(name)).expect("Invalid JSON")
    }

    /// Names of the entries directly in the output directory, sorted.
    pub fn outdir_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.outdir)
            .expect("Failed to read outdir")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Create a file with the given mode, creating parents.
pub fn create_file(path: &Path, content: &[u8], mode: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("Failed to chmod");
}

/// Create a mock executable binary file.
pub fn create_mock_binary(path: &Path) {
    create_file(path, b"#!/bin/sh\necho mock\n", 0o755);
}

/// Create a rootfs that satisfies every required check.
pub fn create_complete_rootfs(root: &Path) {
    create_mock_binary(&root.join("bin/busybox"));
    create_mock_binary(&root.join("sbin/init"));
    create_mock_binary(&root.join("sbin/udevadm"));
    create_mock_binary(&root.join("etc/init.d/S10udev"));
    fs::create_dir_all(root.join("etc/udev/rules.d")).expect("Failed to create udev dir");
    create_file(&root.join("lib/libkmod.so.2"), b"", 0o755);
    create_file(&root.join("lib/libblkid.so"), b"", 0o755);
    create_mock_binary(&root.join("linuxrc"));
    create_file(&root.join("etc/passwd"), b"root:x:0:0:root:/root:/bin/sh\n", 0o644);
}

/// Rootfs layout written by [`FakeExtractor`] in step 2.
pub type Layout = fn(&Path);

/// In-process stand-in for ubireader.
pub struct FakeExtractor {
    /// Exit code of step 1
    pub images_rc: i32,
    /// Exit code of step 2
    pub files_rc: i32,
    /// Whether step 1 creates `ubifs-root`
    pub create_images_dir: bool,
    /// Volume files (name, size) step 1 writes
    pub volumes: Vec<(&'static str, usize)>,
    /// Subdirectory of the step 2 output the rootfs goes into
    pub nest: Option<&'static str>,
    /// What step 2 extracts
    pub layout: Layout,
    /// Volume step 2 was asked to extract
    pub extracted_volume: RefCell<Option<PathBuf>>,
}

impl FakeExtractor {
    pub fn new(layout: Layout) -> Self {
        Self {
            images_rc: 0,
            files_rc: 0,
            create_images_dir: true,
            volumes: vec![
                ("img-1_vol-boot.ubifs", 128),
                ("img-1_vol-rootfs.ubifs", 4096),
                ("img-1_vol-userdata.ubifs", 1024),
            ],
            nest: None,
            layout,
            extracted_volume: RefCell::new(None),
        }
    }
}

impl Extractor for FakeExtractor {
    fn images_tool(&self) -> &str {
        "fake_extract_images"
    }

    fn files_tool(&self) -> &str {
        "fake_extract_files"
    }

    fn extract_images(
        &self,
        image: &Path,
        workdir: &Path,
        log: &mut RunLog,
    ) -> anyhow::Result<i32> {
        log.command(&format!("fake_extract_images {}", image.display()))?;
        log.line("Extracting volumes")?;
        if self.create_images_dir {
            let dir = self.images_dir(workdir).join(image.file_name().unwrap());
            fs::create_dir_all(&dir)?;
            for (name, size) in &self.volumes {
                fs::write(dir.join(name), vec![0xa5u8; *size])?;
            }
        }
        Ok(self.images_rc)
    }

    fn extract_files(
        &self,
        volume: &Path,
        dest: &Path,
        _workdir: &Path,
        log: &mut RunLog,
    ) -> anyhow::Result<i32> {
        log.command(&format!(
            "fake_extract_files {} -o {}",
            volume.display(),
            dest.display()
        ))?;
        *self.extracted_volume.borrow_mut() = Some(volume.to_path_buf());
        if self.files_rc == 0 {
            let root = match self.nest {
                Some(sub) => dest.join(sub),
                None => dest.to_path_buf(),
            };
            (self.layout)(&root);
        }
        Ok(self.files_rc)
    }
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}
