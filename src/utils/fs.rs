//! Filesystem helpers used across the download and install pipeline.
//!
//! Downloads, archive extraction, and disk-image mount points each get a
//! private, uniquely named directory so concurrent operations never collide
//! and no locking is needed. [`ScopedDir`] provides RAII cleanup for the
//! areas that must be removed on every exit path (extraction targets, mount
//! points); [`unique_temp_dir`] creates a directory whose lifetime the caller
//! manages (download results outlive the call that produced them).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Create a directory and any missing parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    Ok(())
}

/// Create a uniquely named directory under the OS temp root.
///
/// The name has the form `airlift_{prefix}_{uuid}`, so two concurrent
/// operations can never land in the same slot.
pub fn unique_temp_dir(prefix: &str) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("airlift_{prefix}_{}", uuid::Uuid::new_v4()));
    ensure_dir(&path)?;
    Ok(path)
}

/// Recursively copy a directory tree.
///
/// Symlinks and other special file types are skipped. Bundles are plain
/// directory trees, so this is the install copy primitive.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "Failed to copy file from {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }

    Ok(())
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// A uniquely named temporary directory removed when dropped.
///
/// Cleanup runs on every exit path, including panics and early `?` returns,
/// which is what the extraction and mount-point areas require. Cleanup
/// failures on drop are ignored; there is nothing useful to do with them at
/// that point.
pub struct ScopedDir {
    path: PathBuf,
}

impl ScopedDir {
    /// Create a new scoped directory with the given name prefix.
    pub fn new(prefix: &str) -> Result<Self> {
        let path = unique_temp_dir(prefix)?;
        Ok(Self { path })
    }

    /// The directory path. Valid for the lifetime of this value.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
