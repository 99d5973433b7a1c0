//! Content-addressed cache keys.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex digest identifying one (path, mtime) pair.
///
/// Always 64 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a file path and its modification time in nanoseconds.
    ///
    /// The digest input is `"{path}:{mtime_ns}"`. The mtime is always the last
    /// `:`-separated field, so distinct pairs never produce the same input even
    /// when the path itself contains a colon.
    #[must_use]
    pub fn new(path: &Path, mtime_ns: i128) -> Self {
        let input = format!("{}:{}", path.to_string_lossy(), mtime_ns);
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The hex string form of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
