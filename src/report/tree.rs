//! Directory listings of the interesting parts of the rootfs.
//!
//! Two builds can be diffed by diffing their `tree_snippets.txt`, which is
//! why the walk is sorted and the format is fixed.

use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::common::resolve_in_root;

/// Top-level directories that get listed.
pub const SNIPPET_DIRS: &[&str] = &["etc", "lib", "lib32", "lib64", "bin", "sbin", "usr/bin"];

/// Walk entries considered per directory (directories count too).
pub const MAX_ENTRIES_PER_DIR: usize = 5000;

/// Render `<size> <path>` lines for every file under each snippet dir.
///
/// Sizes follow symlinks inside the rootfs; a dangling link shows `-1`.
/// Links to directories are skipped like directories.
pub fn tree_snippets(root: &Path) -> String {
    let mut lines: Vec<String> = Vec::new();

    for dir in SNIPPET_DIRS {
        let Some(base) = resolve_in_root(root, dir) else {
            continue;
        };
        lines.push(format!("\n== TREE {} ==\n", dir));

        let entries = WalkDir::new(&base)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .flatten()
            .take(MAX_ENTRIES_PER_DIR);

        for entry in entries {
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(below) = entry.path().strip_prefix(&base) else {
                continue;
            };
            let rel = Path::new(dir).join(below);

            let size = if entry.path_is_symlink() {
                match resolve_in_root(root, &rel.to_string_lossy())
                    .and_then(|p| fs::metadata(p).ok())
                {
                    Some(meta) if meta.is_dir() => continue,
                    Some(meta) => meta.len() as i64,
                    None => -1,
                }
            } else {
                entry.metadata().map(|m| m.len() as i64).unwrap_or(-1)
            };

            lines.push(format!("{:10} {}", size, rel.display()));
        }
    }

    lines.join("\n") + "\n"
}
