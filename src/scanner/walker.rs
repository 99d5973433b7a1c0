//! Vault walker implementation using walkdir for sequential traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for discovering the notes that
//! are eligible for summarization, and [`filter_since`] for the second-stage
//! cutoff filter applied by the pipeline.
//!
//! # Features
//!
//! - Include folders resolved against the root with boundary checks
//! - Exclusion globs expanded once into a materialized set
//! - Symlinks are never followed and never returned
//! - Empty files are skipped
//! - Output ordered by modification time, oldest first
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use vaultdigest::scanner::{DiscoveryConfig, Walker};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/vault"), DiscoveryConfig::default());
//! for file in walker.discover().unwrap() {
//!     println!("{}: {} bytes", file.path.display(), file.size);
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use super::path_utils::resolve_within;
use super::{DiscoveryConfig, FileCandidate, ScanError};

/// Directory walker for candidate discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Discovery configuration
    config: DiscoveryConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path, config: DiscoveryConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, discovery stops and returns
    /// [`ScanError::Interrupted`].
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Discover all eligible candidates, ordered by modification time.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::BoundaryViolation`] if an include folder resolves
    /// outside the root, [`ScanError::NotFound`] / [`ScanError::NotADirectory`]
    /// for a bad root, and [`ScanError::Interrupted`] on shutdown. Errors on
    /// individual entries are logged and skipped.
    pub fn discover(&self) -> Result<Vec<FileCandidate>, ScanError> {
        let root = self.canonical_root()?;
        let search_roots = self.search_roots(&root)?;
        let excluded = self.build_exclusions(&root);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for search_root in &search_roots {
            if !search_root.exists() {
                log::debug!(
                    "Include folder does not exist, skipping: {}",
                    search_root.display()
                );
                continue;
            }

            for entry in WalkDir::new(search_root)
                .follow_links(false)
                .sort_by_file_name()
            {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    return Err(ScanError::Interrupted);
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().unwrap_or(search_root.as_path());
                        log::warn!("Walker error for {}: {}", path.display(), e);
                        continue;
                    }
                };

                let file_type = entry.file_type();
                if file_type.is_symlink() {
                    log::trace!("Skipping symlink: {}", entry.path().display());
                    continue;
                }
                if !file_type.is_file() || !self.matches_extension(entry.path()) {
                    continue;
                }

                let path = entry.into_path();
                if excluded.contains(&path) {
                    log::trace!("Excluding file: {}", path.display());
                    continue;
                }
                if !seen.insert(path.clone()) {
                    continue;
                }

                if let Some(candidate) = self.process_file(path) {
                    candidates.push(candidate);
                }
            }
        }

        candidates.sort_by_key(|c| c.modified);
        log::debug!(
            "Discovered {} candidates under {}",
            candidates.len(),
            root.display()
        );
        Ok(candidates)
    }

    /// Validate and canonicalize the root directory.
    fn canonical_root(&self) -> Result<PathBuf, ScanError> {
        if !self.root.exists() {
            return Err(ScanError::NotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        self.root.canonicalize().map_err(|source| ScanError::Io {
            path: self.root.clone(),
            source,
        })
    }

    /// Resolve the directories to walk.
    fn search_roots(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if self.config.include_folders.is_empty() {
            return Ok(vec![root.to_path_buf()]);
        }

        self.config
            .include_folders
            .iter()
            .map(|folder| resolve_within(root, folder).map_err(ScanError::from))
            .collect()
    }

    /// Expand every exclusion pattern once against the root.
    ///
    /// A matched file is excluded; a matched directory excludes every file
    /// beneath it.
    fn build_exclusions(&self, root: &Path) -> HashSet<PathBuf> {
        let mut excluded = HashSet::new();
        let escaped_root = Pattern::escape(&root.to_string_lossy());
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        for pattern in &self.config.exclude_globs {
            let full = format!("{}/{}", escaped_root, pattern.trim_start_matches('/'));
            let matches = match glob::glob_with(&full, options) {
                Ok(paths) => paths,
                Err(e) => {
                    log::warn!("Invalid exclude pattern '{}': {}", pattern, e);
                    continue;
                }
            };

            for matched in matches.filter_map(Result::ok) {
                if matched.is_dir() {
                    for entry in WalkDir::new(&matched)
                        .follow_links(false)
                        .into_iter()
                        .filter_map(Result::ok)
                        .filter(|e| !e.file_type().is_dir())
                    {
                        excluded.insert(entry.into_path());
                    }
                } else {
                    excluded.insert(matched);
                }
            }
        }

        log::debug!("Exclusion set holds {} paths", excluded.len());
        excluded
    }

    /// Check a file's extension against the configured list.
    fn matches_extension(&self, path: &Path) -> bool {
        if self.config.extensions.is_empty() {
            return true;
        }

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.config
            .extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&extension))
    }

    /// Read metadata and build a candidate if the file is non-empty.
    fn process_file(&self, path: PathBuf) -> Option<FileCandidate> {
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("I/O error for {}: {}", path.display(), e);
                return None;
            }
        };

        if metadata.len() == 0 {
            log::debug!("Skipping empty file: {}", path.display());
            return None;
        }

        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("No modification time for {}: {}", path.display(), e);
                return None;
            }
        };

        Some(FileCandidate::new(path, modified, metadata.len()))
    }
}

/// Keep candidates modified strictly after `cutoff`, oldest first.
#[must_use]
pub fn filter_since(candidates: Vec<FileCandidate>, cutoff: DateTime<Utc>) -> Vec<FileCandidate> {
    let mut result: Vec<_> = candidates
        .into_iter()
        .filter(|c| c.modified_utc() > cutoff)
        .collect();
    result.sort_by_key(|c| c.modified);
    result
}
