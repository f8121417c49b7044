//! `meta.json`: the run's audit record.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::RunRecord;

/// Grep results keyed by config path, serialized in discovery order
/// (the same order as `buildroot_configs` and the summary).
#[derive(Debug, Clone, Default)]
pub struct ConfigGrep(pub Vec<(String, BTreeMap<String, Vec<String>>)>);

impl Serialize for ConfigGrep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(cfg, hits)| (cfg, hits)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub rootfs_img: PathBuf,
    pub rootfs_img_size: u64,
    pub rootfs_img_sha256: String,
    pub env: BTreeMap<String, String>,
    pub buildroot_configs: Vec<PathBuf>,
    pub buildroot_config_grep: ConfigGrep,
    pub volume_file: PathBuf,
    pub volume_file_size: u64,
    pub volume_file_sha256: String,
    pub extracted_rootfs_dir: PathBuf,
    pub optional_presence: BTreeMap<String, bool>,
    pub checks_passed: bool,
    pub failed_checks: Vec<String>,
}

impl RunMetadata {
    pub fn from_record(record: &RunRecord) -> Self {
        let buildroot_config_grep = ConfigGrep(
            record
                .buildroot
                .grep
                .iter()
                .map(|(cfg, hits)| (cfg.to_string_lossy().into_owned(), hits.clone()))
                .collect(),
        );

        Self {
            rootfs_img: record.image.path.clone(),
            rootfs_img_size: record.image.size,
            rootfs_img_sha256: record.image.sha256.clone(),
            env: record.env.clone(),
            buildroot_configs: record.buildroot.configs.clone(),
            buildroot_config_grep,
            volume_file: record.volume.path.clone(),
            volume_file_size: record.volume.size,
            volume_file_sha256: record.volume.sha256.clone(),
            extracted_rootfs_dir: record.rootfs_root.clone(),
            optional_presence: record.checklist.optional.clone(),
            checks_passed: record.checklist.all_passed(),
            failed_checks: record
                .checklist
                .results
                .iter()
                .filter(|r| !r.ok)
                .map(|r| r.check.clone())
                .collect(),
        }
    }
}
