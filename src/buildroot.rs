//! Build-system context recorded alongside the verdict.
//!
//! When a check fails, the first question is usually "was the package even
//! enabled?". So the run also collects the Buildroot `.config` files found
//! in the workspace and greps them for the options behind each check, and
//! records the `BR2_*` environment the build ran with.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Options whose lines are pulled out of each `.config`.
pub const KEY_CONFIG_GREP: &[&str] = &[
    "BR2_PACKAGE_EUDEV",
    "BR2_PACKAGE_KMOD",
    "BR2_PACKAGE_UTIL_LINUX",
    "BR2_PACKAGE_UTIL_LINUX_LIBBLKID",
    "BR2_PACKAGE_BUSYBOX",
    "BR2_ROOTFS_OVERLAY",
];

/// At most this many configs are grepped.
pub const MAX_GREPPED_CONFIGS: usize = 5;

/// At most this many matching lines are kept per option.
pub const MAX_LINES_PER_KEY: usize = 20;

/// Key used in place of matches when a config cannot be read.
pub const ERROR_KEY: &str = "__error__";

/// Always recorded, whatever prefix is configured.
const BR2_EXTERNAL: &str = "BR2_EXTERNAL";

/// Where a `.config` may sit below a `buildroot*/output*` directory.
///
/// Mirrors the layouts:
/// - `buildroot*/output*/.config`
/// - `buildroot*/output*/build/.config`
/// - `buildroot*/output*/buildroot/.config`
/// - `buildroot*/output*/buildroot-*/.config`
#[derive(Debug, Clone, Copy)]
enum ConfigLayout {
    OutputRoot,
    Build,
    Buildroot,
    BuildrootVersioned,
}

const LAYOUTS: &[ConfigLayout] = &[
    ConfigLayout::OutputRoot,
    ConfigLayout::Build,
    ConfigLayout::Buildroot,
    ConfigLayout::BuildrootVersioned,
];

impl ConfigLayout {
    /// `dirs` are the directory names above `.config`, nearest last.
    fn matches(self, dirs: &[&str]) -> bool {
        let n = dirs.len();
        let is_tree = |i: usize| dirs[i].starts_with("buildroot");
        let is_output = |i: usize| dirs[i].starts_with("output");
        match self {
            ConfigLayout::OutputRoot => n >= 2 && is_tree(n - 2) && is_output(n - 1),
            ConfigLayout::Build => {
                n >= 3 && is_tree(n - 3) && is_output(n - 2) && dirs[n - 1] == "build"
            }
            ConfigLayout::Buildroot => {
                n >= 3 && is_tree(n - 3) && is_output(n - 2) && dirs[n - 1] == "buildroot"
            }
            ConfigLayout::BuildrootVersioned => {
                n >= 3
                    && is_tree(n - 3)
                    && is_output(n - 2)
                    && dirs[n - 1].starts_with("buildroot-")
            }
        }
    }
}

/// Find Buildroot `.config` files under `search_root`.
///
/// Results are grouped by layout (in [`LAYOUTS`] order), lexical within a
/// layout, and de-duplicated by canonical path. `.git` is not descended.
///
/// Symlinked directories are followed only when named `buildroot*` or
/// `output*`, so a `buildroot/output -> /scratch/out` link is found while
/// unrelated links cannot drag the walk out of the workspace. Link loops
/// surface as walk errors and are skipped.
pub fn find_buildroot_configs(search_root: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<(PathBuf, Vec<String>)> = Vec::new();

    let walker = WalkDir::new(search_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if !e.file_type().is_dir() || e.depth() == 0 {
                return true;
            }
            if e.file_name() == OsStr::new(".git") {
                return false;
            }
            !e.path_is_symlink() || is_followed_link_name(e.file_name())
        });

    for entry in walker.flatten() {
        if entry.file_name() != OsStr::new(".config") || !entry.path().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(search_root) else {
            continue;
        };
        let dirs: Vec<String> = rel
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        candidates.push((entry.into_path(), dirs));
    }

    let mut seen = HashSet::new();
    let mut configs = Vec::new();
    for layout in LAYOUTS {
        for (path, dirs) in &candidates {
            let dirs: Vec<&str> = dirs.iter().map(String::as_str).collect();
            if !layout.matches(&dirs) {
                continue;
            }
            let key = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            if seen.insert(key) {
                configs.push(path.clone());
            }
        }
    }
    configs
}

fn is_followed_link_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with("buildroot") || name.starts_with("output")
}

/// Matching lines per option for one config.
///
/// A line matches `KEY` when it starts with `KEY=` or `# KEY` (the
/// "is not set" form). Options without matches are left out.
pub fn grep_config_text(text: &str, keys: &[&str]) -> BTreeMap<String, Vec<String>> {
    let mut hits = BTreeMap::new();
    for key in keys {
        let assigned = format!("{}=", key);
        let unset = format!("# {}", key);
        let matched: Vec<String> = text
            .lines()
            .filter(|line| line.starts_with(&assigned) || line.starts_with(&unset))
            .take(MAX_LINES_PER_KEY)
            .map(str::to_string)
            .collect();
        if !matched.is_empty() {
            hits.insert(key.to_string(), matched);
        }
    }
    hits
}

/// Grep one config file; a read failure is recorded instead of returned.
pub fn grep_config_file(path: &Path, keys: &[&str]) -> BTreeMap<String, Vec<String>> {
    match fs::read(path) {
        Ok(bytes) => grep_config_text(&String::from_utf8_lossy(&bytes), keys),
        Err(e) => {
            eprintln!("  [WARN] Failed to read {}: {}", path.display(), e);
            let mut hits = BTreeMap::new();
            hits.insert(ERROR_KEY.to_string(), vec![e.to_string()]);
            hits
        }
    }
}

/// Discovered configs and what was grepped out of them.
#[derive(Debug, Clone, Default)]
pub struct BuildrootContext {
    /// Every config found, in discovery order.
    pub configs: Vec<PathBuf>,
    /// Grep results for the first [`MAX_GREPPED_CONFIGS`] configs, keyed
    /// by path, in discovery order.
    pub grep: Vec<(PathBuf, BTreeMap<String, Vec<String>>)>,
}

impl BuildrootContext {
    /// Discover and grep configs under `workspace`.
    pub fn collect(workspace: &Path) -> Self {
        let configs = find_buildroot_configs(workspace);
        let grep = configs
            .iter()
            .take(MAX_GREPPED_CONFIGS)
            .map(|cfg| (cfg.clone(), grep_config_file(cfg, KEY_CONFIG_GREP)))
            .collect();
        Self { configs, grep }
    }
}

/// Variables named `BR2_EXTERNAL` or starting with `prefix`.
pub fn build_env<'a, I>(vars: I, prefix: &str) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    vars.into_iter()
        .filter(|(k, _)| k.as_str() == BR2_EXTERNAL || k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_layout_matching() {
        assert!(ConfigLayout::OutputRoot.matches(&["src", "buildroot", "output"]));
        assert!(ConfigLayout::OutputRoot.matches(&["buildroot-2024.02", "output-rk3308"]));
        assert!(!ConfigLayout::OutputRoot.matches(&["output"]));
        assert!(ConfigLayout::Build.matches(&["buildroot", "output", "build"]));
        assert!(ConfigLayout::Buildroot.matches(&["buildroot", "output", "buildroot"]));
        assert!(ConfigLayout::BuildrootVersioned.matches(&[
            "buildroot",
            "output",
            "buildroot-config"
        ]));
        assert!(!ConfigLayout::Build.matches(&["buildroot", "output", "target"]));
        assert!(!ConfigLayout::OutputRoot.matches(&["linux", "output"]));
    }

    #[test]
    fn test_find_configs_in_layout_order() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path();
        touch(&ws.join("sdk/buildroot/output/rockchip_rk3308/build/.config"), "");
        touch(&ws.join("sdk/buildroot/output/.config"), "");
        touch(&ws.join("buildroot-2021/output-b/build/.config"), "");
        touch(&ws.join("buildroot-2021/output-a/.config"), "");
        // Not a buildroot tree
        touch(&ws.join("kernel/output/.config"), "");
        // Wrong depth below output
        touch(&ws.join("buildroot/output/target/etc/.config"), "");

        let configs = find_buildroot_configs(ws);
        assert_eq!(
            configs,
            vec![
                ws.join("buildroot-2021/output-a/.config"),
                ws.join("sdk/buildroot/output/.config"),
                ws.join("buildroot-2021/output-b/build/.config"),
            ]
        );
    }

    #[test]
    fn test_find_configs_skips_git() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join(".git/buildroot/output/.config"), "");
        assert!(find_buildroot_configs(temp.path()).is_empty());
    }

    #[test]
    fn test_find_configs_none() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("README"), "");
        assert!(find_buildroot_configs(temp.path()).is_empty());
    }

    #[test]
    fn test_find_configs_dedups_symlinked_config() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path();
        touch(&ws.join("buildroot/output/.config"), "");
        fs::create_dir_all(ws.join("buildroot/output/build")).unwrap();
        symlink("../.config", ws.join("buildroot/output/build/.config")).unwrap();

        assert_eq!(find_buildroot_configs(ws), vec![ws.join("buildroot/output/.config")]);
    }

    #[test]
    fn test_find_configs_through_symlinked_dirs() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path();
        touch(&ws.join("out_real/.config"), "");
        fs::create_dir_all(ws.join("buildroot")).unwrap();
        symlink("../out_real", ws.join("buildroot/output")).unwrap();
        touch(&ws.join("real_br/output/.config"), "");
        symlink("real_br", ws.join("buildroot-sdk")).unwrap();

        assert_eq!(
            find_buildroot_configs(ws),
            vec![
                ws.join("buildroot/output/.config"),
                ws.join("buildroot-sdk/output/.config"),
            ]
        );
    }

    #[test]
    fn test_find_configs_ignores_unrelated_links_and_loops() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path();
        let elsewhere = TempDir::new().unwrap();
        touch(&elsewhere.path().join("buildroot/output/.config"), "");
        symlink(elsewhere.path(), ws.join("scratch")).unwrap();

        touch(&ws.join("buildroot/output/.config"), "");
        symlink("..", ws.join("buildroot/output/buildroot-loop")).unwrap();

        assert_eq!(find_buildroot_configs(ws), vec![ws.join("buildroot/output/.config")]);
    }

    #[test]
    fn test_grep_config_text() {
        let text = "\
BR2_PACKAGE_EUDEV=y
BR2_PACKAGE_KMOD=y
# BR2_PACKAGE_KMOD_TOOLS is not set
BR2_PACKAGE_UTIL_LINUX=y
BR2_PACKAGE_UTIL_LINUX_LIBBLKID=y
BR2_ROOTFS_OVERLAY=\"board/rockchip/common/base\"
  BR2_PACKAGE_BUSYBOX=y
";
        let hits = grep_config_text(text, KEY_CONFIG_GREP);
        assert_eq!(hits["BR2_PACKAGE_EUDEV"], vec!["BR2_PACKAGE_EUDEV=y"]);
        assert_eq!(
            hits["BR2_PACKAGE_KMOD"],
            vec!["BR2_PACKAGE_KMOD=y", "# BR2_PACKAGE_KMOD_TOOLS is not set"]
        );
        // `KEY=` keeps UTIL_LINUX from swallowing UTIL_LINUX_LIBBLKID
        assert_eq!(hits["BR2_PACKAGE_UTIL_LINUX"], vec!["BR2_PACKAGE_UTIL_LINUX=y"]);
        assert!(hits.contains_key("BR2_ROOTFS_OVERLAY"));
        // Indented lines do not match
        assert!(!hits.contains_key("BR2_PACKAGE_BUSYBOX"));
    }

    #[test]
    fn test_grep_caps_lines_per_key() {
        let text = "BR2_PACKAGE_EUDEV=y\n".repeat(50);
        let hits = grep_config_text(&text, &["BR2_PACKAGE_EUDEV"]);
        assert_eq!(hits["BR2_PACKAGE_EUDEV"].len(), MAX_LINES_PER_KEY);
    }

    #[test]
    fn test_grep_unreadable_config() {
        let temp = TempDir::new().unwrap();
        let hits = grep_config_file(&temp.path().join("missing/.config"), KEY_CONFIG_GREP);
        assert_eq!(hits.len(), 1);
        assert!(hits.contains_key(ERROR_KEY));
    }

    #[test]
    fn test_grep_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".config");
        fs::write(&path, b"BR2_PACKAGE_KMOD=y\n\xff\xfe junk\n").unwrap();
        let hits = grep_config_file(&path, KEY_CONFIG_GREP);
        assert_eq!(hits["BR2_PACKAGE_KMOD"], vec!["BR2_PACKAGE_KMOD=y"]);
    }

    #[test]
    fn test_collect_limits_grepped_configs() {
        let temp = TempDir::new().unwrap();
        for i in 0..7 {
            touch(
                &temp.path().join(format!("buildroot{}/output/.config", i)),
                "BR2_PACKAGE_BUSYBOX=y\n",
            );
        }
        let ctx = BuildrootContext::collect(temp.path());
        assert_eq!(ctx.configs.len(), 7);
        assert_eq!(ctx.grep.len(), MAX_GREPPED_CONFIGS);
    }

    #[test]
    fn test_build_env_prefix() {
        let vars: BTreeMap<String, String> = [
            ("BR2_EXTERNAL", "/ext"),
            ("BR2_DL_DIR", "/dl"),
            ("PATH", "/usr/bin"),
            ("XBR2_NOPE", "x"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let env = build_env(&vars, "BR2_");
        assert_eq!(env.len(), 2);
        assert_eq!(env["BR2_EXTERNAL"], "/ext");
        assert_eq!(env["BR2_DL_DIR"], "/dl");

        let env = build_env(&vars, "PTX_");
        assert_eq!(env.keys().collect::<Vec<_>>(), vec!["BR2_EXTERNAL"]);
    }
}
