//! Utilities for file operations with automatic parent directory creation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Write a file, creating parent directories as needed.
///
/// This is a convenience function that combines creating the parent directory
/// with writing the file content, eliminating the common pattern of:
/// ```ignore
/// if let Some(parent) = path.parent() {
///     fs::create_dir_all(parent)?;
/// }
/// fs::write(path, content)?;
/// ```
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
