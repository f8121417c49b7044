//! Checklist evaluator.
//!
//! All lookups go through [`resolve_in_root`], so symlinks in the image are
//! followed as the target would follow them and never touch the host.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use super::{CheckDef, CheckKind, CheckResult};
use crate::common::{exists_in_root, is_executable, resolve_in_root};

/// Every required result plus the informational presence map.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistReport {
    pub results: Vec<CheckResult>,
    pub optional: BTreeMap<String, bool>,
}

impl ChecklistReport {
    /// Returns true if no required check failed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.ok)
    }

    /// Count of failed checks.
    pub fn fail_count(&self) -> usize {
        self.results.iter().filter(|r| !r.ok).count()
    }
}

/// Evaluate one check against `root`.
pub fn evaluate(root: &Path, def: &CheckDef) -> CheckResult {
    let executable_in_root =
        |rel: &str| resolve_in_root(root, rel).is_some_and(|p| is_executable(&p));

    let (ok, hits, extra) = match def.kind {
        CheckKind::AnyOf => {
            let (ok, hits) = any_group(root, def);
            (ok, hits, Map::new())
        }
        CheckKind::MustBeExecutable { path } => {
            let (ok, hits) = any_group(root, def);
            let exists = exists_in_root(root, path);
            let executable = exists && executable_in_root(path);

            let mut extra = Map::new();
            extra.insert("exists".into(), Value::Bool(exists));
            extra.insert("executable".into(), Value::Bool(executable));
            (ok && executable, hits, extra)
        }
        CheckKind::AnyExecutable => {
            let found: Vec<String> = def
                .candidates()
                .filter(|rel| exists_in_root(root, rel))
                .map(str::to_string)
                .collect();
            let any_executable = found.iter().any(|rel| executable_in_root(rel.as_str()));

            let mut extra = Map::new();
            extra.insert(
                "found".into(),
                Value::Array(found.iter().cloned().map(Value::String).collect()),
            );
            extra.insert("any_executable".into(), Value::Bool(any_executable));
            (any_executable, found, extra)
        }
    };

    CheckResult {
        check: def.name.to_string(),
        ok,
        hits,
        extra,
    }
}

/// Generic OR-of-ANDs existence check.
///
/// Hits list every alternative whose representative path exists, whether
/// or not the rest of its group does.
fn any_group(root: &Path, def: &CheckDef) -> (bool, Vec<String>) {
    let ok = def
        .groups
        .iter()
        .any(|group| group.iter().all(|rel| exists_in_root(root, rel)));
    let hits = def
        .candidates()
        .filter(|rel| exists_in_root(root, rel))
        .map(str::to_string)
        .collect();
    (ok, hits)
}

/// Presence of each optional path under `root`.
pub fn optional_presence(root: &Path, paths: &[&str]) -> BTreeMap<String, bool> {
    paths
        .iter()
        .map(|rel| (rel.to_string(), exists_in_root(root, rel)))
        .collect()
}

/// Evaluate `checks` in order and scan `optional` paths.
pub fn evaluate_all(root: &Path, checks: &[CheckDef], optional: &[&str]) -> ChecklistReport {
    ChecklistReport {
        results: checks.iter().map(|def| evaluate(root, def)).collect(),
        optional: optional_presence(root, optional),
    }
}
