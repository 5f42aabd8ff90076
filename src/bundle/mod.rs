//! Locating the application bundle inside an extracted or mounted tree.
//!
//! Archives in the wild either contain the bundle at the top level or wrap it
//! in a single named folder (`MyApp-2.0/MyApp.app`). The locator checks the
//! directory's immediate children first and then one level deeper; anything
//! deeper than that is not an update package we recognize. Absence is not an
//! error here: the caller decides whether "no bundle" is fatal.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Find the application bundle within `dir`.
///
/// Searches immediate children for an entry whose extension matches
/// `extension` (without the leading dot), then the children of each
/// subdirectory. Returns `Ok(None)` when nothing matches. Read-only; repeated
/// calls on the same tree return the same result.
///
/// # Errors
///
/// Propagates I/O errors from reading the directory itself. A subdirectory
/// that cannot be read during the second pass is skipped rather than treated
/// as fatal, since other siblings may still hold the bundle.
pub fn locate_bundle(dir: &Path, extension: &str) -> std::io::Result<Option<PathBuf>> {
    if let Some(found) = scan_children(dir, extension)? {
        return Ok(Some(found));
    }

    // One level deeper, for archives that wrap the bundle in a folder.
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match scan_children(&entry.path(), extension) {
            Ok(Some(found)) => return Ok(Some(found)),
            Ok(None) => {}
            Err(err) => {
                debug!(
                    "Skipping unreadable subdirectory {}: {err}",
                    entry.path().display()
                );
            }
        }
    }

    Ok(None)
}

/// Scan the immediate children of `dir` for a bundle.
fn scan_children(dir: &Path, extension: &str) -> std::io::Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            debug!("Found bundle: {}", path.display());
            return Ok(Some(path));
        }
    }
    Ok(None)
}
