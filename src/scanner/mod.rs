//! Scanner module for vault traversal and candidate discovery.
//!
//! This module provides functionality for:
//! - Resolving include folders against the vault root with boundary checks
//! - Sequential directory walking using walkdir (symlinks never followed)
//! - Exclusion patterns expanded once per run into a materialized set
//! - Ordering candidates by modification time, oldest first
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal, filtering and the mtime cutoff
//! - [`path_utils`]: Boundary resolution shared with the digest writer
//!
//! # Example
//!
//! ```no_run
//! use vaultdigest::scanner::{filter_since, DiscoveryConfig, Walker};
//! use chrono::Utc;
//! use std::path::Path;
//!
//! let config = DiscoveryConfig {
//!     include_folders: vec!["Clippings".to_string()],
//!     exclude_globs: vec!["Templates".to_string()],
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/vault"), config);
//! let candidates = walker.discover().unwrap();
//! for file in filter_since(candidates, Utc::now()) {
//!     println!("{}", file.path.display());
//! }
//! ```

pub mod path_utils;
pub mod walker;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

pub use path_utils::BoundaryError;
pub use walker::{filter_since, Walker};

/// A file eligible for processing in the current run.
///
/// Recomputed from the filesystem on every run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Last modification time
    pub modified: SystemTime,
    /// File size in bytes
    pub size: u64,
}

impl FileCandidate {
    /// Create a new FileCandidate.
    #[must_use]
    pub fn new(path: PathBuf, modified: SystemTime, size: u64) -> Self {
        Self {
            path,
            modified,
            size,
        }
    }

    /// Modification time in nanoseconds since the Unix epoch.
    ///
    /// Negative for files dated before the epoch.
    #[must_use]
    pub fn mtime_nanos(&self) -> i128 {
        match self.modified.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_nanos() as i128,
            Err(e) => -(e.duration().as_nanos() as i128),
        }
    }

    /// Modification time as a UTC timestamp.
    #[must_use]
    pub fn modified_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.modified)
    }

    /// File stem, used as the note title.
    #[must_use]
    pub fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Configuration for candidate discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Folders (relative to the root) to restrict the search to.
    /// Empty means the whole root.
    pub include_folders: Vec<String>,

    /// Glob patterns, relative to the root, whose matches are excluded.
    /// A matched directory excludes everything beneath it.
    pub exclude_globs: Vec<String>,

    /// File extensions to collect, without the leading dot (case-insensitive).
    /// Empty means every regular file.
    pub extensions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            include_folders: Vec::new(),
            exclude_globs: Vec::new(),
            extensions: vec!["md".to_string()],
        }
    }
}

/// Errors that can occur during discovery.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// An include folder resolves outside the root.
    #[error(transparent)]
    BoundaryViolation(#[from] BoundaryError),

    /// The root directory was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Discovery was stopped by a shutdown request.
    #[error("Scan interrupted by user")]
    Interrupted,

    /// An I/O error occurred while accessing the root.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
