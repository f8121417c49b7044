//! Path lookups inside an extracted rootfs.
//!
//! Extracted images are full of symlinks written for the target
//! (`sbin/init -> ../bin/busybox`, `lib -> /usr/lib`). Following them
//! with the host's resolver would escape the tree for absolute targets,
//! so lookups here walk one component at a time and re-root absolute
//! link targets at the rootfs root, like a chroot would.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

/// Same limit the Linux kernel applies (MAXSYMLINKS).
const MAX_SYMLINK_HOPS: usize = 40;

enum Step {
    Parent,
    Name(OsString),
}

fn steps(path: &Path) -> impl Iterator<Item = Step> + '_ {
    path.components().filter_map(|c| match c {
        Component::Normal(name) => Some(Step::Name(name.to_os_string())),
        Component::ParentDir => Some(Step::Parent),
        Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
    })
}

/// Resolve `rel` under `root`, following symlinks without leaving `root`.
///
/// Returns the host path of the final target, or `None` if any component
/// is missing, a link loop is detected, or a non-directory is traversed.
pub fn resolve_in_root(root: &Path, rel: &str) -> Option<PathBuf> {
    let mut pending: VecDeque<Step> = steps(Path::new(rel)).collect();
    let mut current = root.to_path_buf();
    let mut hops = 0;

    while let Some(step) = pending.pop_front() {
        let name = match step {
            Step::Parent => {
                if current != root {
                    current.pop();
                }
                continue;
            }
            Step::Name(name) => name,
        };

        let next = current.join(&name);
        let meta = fs::symlink_metadata(&next).ok()?;
        if !meta.file_type().is_symlink() {
            current = next;
            continue;
        }

        hops += 1;
        if hops > MAX_SYMLINK_HOPS {
            return None;
        }
        let target = fs::read_link(&next).ok()?;
        if target.has_root() {
            current = root.to_path_buf();
        }
        let mut expanded: Vec<Step> = steps(&target).collect();
        while let Some(s) = expanded.pop() {
            pending.push_front(s);
        }
    }

    Some(current)
}

/// Whether `rel` exists under `root`.
pub fn exists_in_root(root: &Path, rel: &str) -> bool {
    resolve_in_root(root, rel).is_some()
}

/// True if any of the owner/group/other execute bits are set.
pub fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}
