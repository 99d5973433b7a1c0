//! Cache entry definitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached result together with the provenance of the note it came from.
///
/// The result's own fields are flattened into the same JSON object, so an
/// entry file reads as the summary plus `path` and `mtime_utc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored result; opaque to the cache.
    #[serde(flatten)]
    pub result: T,
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Modification time of the source file when the result was produced.
    pub mtime_utc: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Attach provenance to a freshly produced result.
    #[must_use]
    pub fn new(result: T, path: PathBuf, mtime_utc: DateTime<Utc>) -> Self {
        Self {
            result,
            path,
            mtime_utc,
        }
    }
}
