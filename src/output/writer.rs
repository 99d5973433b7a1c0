//! Vault-backed [`DigestWriter`].

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::{DigestWriter, OutputError};
use crate::atomic::write_atomic;
use crate::scanner::path_utils::{reject_unsafe_relative, resolve_within};

/// Writes `YYYY-MM-DD-digest.md` into a folder inside the vault.
///
/// The folder must be relative, free of `..` components, and still inside
/// the vault once symlinks are resolved. Writing the same date twice
/// replaces the earlier digest.
#[derive(Debug, Clone)]
pub struct VaultWriter {
    vault_root: PathBuf,
    folder: String,
}

impl VaultWriter {
    /// Create a writer for `folder` under `vault_root`.
    #[must_use]
    pub fn new(vault_root: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            vault_root: vault_root.into(),
            folder: folder.into(),
        }
    }

    /// File name used for a given date.
    #[must_use]
    pub fn file_name(date: NaiveDate) -> String {
        format!("{}-digest.md", date.format("%Y-%m-%d"))
    }

    /// Resolve the destination folder, enforcing the vault boundary.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::BoundaryViolation`] or
    /// [`OutputError::VaultNotAccessible`].
    pub fn destination_dir(&self) -> Result<PathBuf, OutputError> {
        reject_unsafe_relative(&self.vault_root, &self.folder)?;

        let vault = self
            .vault_root
            .canonicalize()
            .map_err(|source| OutputError::VaultNotAccessible {
                path: self.vault_root.clone(),
                source,
            })?;

        Ok(resolve_within(&vault, &self.folder)?)
    }

    /// Vault root as configured.
    #[must_use]
    pub fn vault_root(&self) -> &Path {
        &self.vault_root
    }
}

impl DigestWriter for VaultWriter {
    fn check(&self) -> Result<(), OutputError> {
        self.destination_dir().map(|_| ())
    }

    fn write(&self, date: NaiveDate, content: &str) -> Result<PathBuf, OutputError> {
        let path = self.destination_dir()?.join(Self::file_name(date));

        write_atomic(&path, content.as_bytes()).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;

        log::info!("Wrote digest to {}", path.display());
        Ok(path)
    }
}
