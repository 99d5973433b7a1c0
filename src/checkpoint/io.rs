//! Loading and saving the checkpoint file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{CheckpointError, CheckpointState};
use crate::atomic::write_atomic;

/// Owns the on-disk checkpoint record.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store for the checkpoint file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the checkpoint file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint.
    ///
    /// A missing file is the first run and yields an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the file exists but cannot be read,
    /// and [`CheckpointError::Corrupt`] if it does not parse.
    pub fn load(&self) -> Result<CheckpointState, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(
                    "No checkpoint at {}, treating as first run",
                    self.path.display()
                );
                return Ok(CheckpointState::first_run());
            }
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| CheckpointError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Save the checkpoint via temp file and atomic rename.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the write or rename fails.
    pub fn save(&self, state: &CheckpointState) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(state).map_err(|e| CheckpointError::Io {
            path: self.path.clone(),
            source: e.into(),
        })?;

        write_atomic(&self.path, json.as_bytes()).map_err(|source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        })?;

        log::debug!("Saved checkpoint to {}", self.path.display());
        Ok(())
    }
}
