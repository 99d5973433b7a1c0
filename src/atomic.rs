//! Write-then-publish persistence shared by the cache, checkpoint and digest writer.
//!
//! Content is written to a scoped [`tempfile::NamedTempFile`] created in the
//! same directory as the destination, synced, and then renamed over the
//! destination. A crash at any point leaves either the previous file or the
//! complete new one; a reader never observes a truncated file. Temp files that
//! were never persisted are removed when the handle drops.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `contents`.
///
/// The parent directory is created if it does not exist.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be created, the
/// temp file cannot be written or synced, or the final rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    log::trace!("Persisted {} bytes to {}", contents.len(), path.display());
    Ok(())
}
