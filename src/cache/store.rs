//! Directory-backed summary cache.
//!
//! Each entry lives in its own file named `<key>.json` inside the cache
//! directory. Reads never fail the caller: a missing file is a miss, and an
//! unreadable or malformed file is logged and also treated as a miss so the
//! note is simply summarized again.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CacheKey;
use crate::atomic::write_atomic;

/// File extension used for cache entry files.
pub const CACHE_EXTENSION: &str = "json";

/// Errors that can occur when writing to the cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The entry could not be serialized.
    #[error("Failed to serialize cache entry {key}: {source}")]
    Serialize {
        /// Key of the entry being written
        key: String,
        /// The underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// The entry could not be written to disk.
    #[error("Failed to write cache entry {}: {source}", path.display())]
    Io {
        /// Destination file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Persistent cache of per-note results, keyed by [`CacheKey`].
#[derive(Debug, Clone)]
pub struct SummaryCache {
    dir: PathBuf,
}

impl SummaryCache {
    /// Create a cache rooted at `dir`.
    ///
    /// The directory is not touched until the first [`put`](Self::put).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entry files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry file for `key`.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key.as_str(), CACHE_EXTENSION))
    }

    /// Look up an entry.
    ///
    /// Returns `None` when the entry is absent, unreadable, or does not
    /// deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let path = self.entry_path(key);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Failed to read cache entry {}: {}. Regenerating.", key, e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Failed to load cache entry {}: {}. Regenerating.", key, e);
                None
            }
        }
    }

    /// Store an entry, replacing any previous file for the same key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if serialization or the atomic write fails.
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| CacheError::Serialize {
            key: key.to_string(),
            source,
        })?;

        let path = self.entry_path(key);
        write_atomic(&path, json.as_bytes()).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        log::trace!("Cached entry {} at {}", key, path.display());
        Ok(())
    }
}
