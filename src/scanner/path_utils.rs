//! Boundary resolution for user-supplied relative paths.
//!
//! Include folders and the digest folder come from configuration and are
//! joined onto the vault root. Both must stay inside the root after symlink
//! resolution, otherwise the configuration is rejected.
//!
//! # Example
//!
//! ```no_run
//! use vaultdigest::scanner::path_utils::resolve_within;
//! use std::path::Path;
//!
//! let root = Path::new("/home/user/vault").canonicalize().unwrap();
//! assert!(resolve_within(&root, "Clippings").is_ok());
//! assert!(resolve_within(&root, "../.ssh").is_err());
//! ```

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Why a path was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryReason {
    /// The entry is an absolute path.
    Absolute,
    /// The entry contains a `..` component.
    Traversal,
    /// The entry resolves outside the root.
    Escapes(PathBuf),
}

impl fmt::Display for BoundaryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute paths are not allowed"),
            Self::Traversal => write!(f, "parent directory components are not allowed"),
            Self::Escapes(resolved) => write!(f, "resolves to {}", resolved.display()),
        }
    }
}

/// A configured path would leave its root directory.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Boundary violation: '{entry}' must stay within {}: {reason}", root.display())]
pub struct BoundaryError {
    /// The entry as configured
    pub entry: String,
    /// The root it must stay within
    pub root: PathBuf,
    /// What was wrong with it
    pub reason: BoundaryReason,
}

/// Resolve `entry` relative to `root` and require the result to stay inside it.
///
/// `root` must already be canonical. Symlinks along the existing part of the
/// joined path are resolved; components that do not exist yet are appended
/// lexically.
///
/// # Errors
///
/// Returns [`BoundaryError`] with [`BoundaryReason::Escapes`] if the resolved
/// path is not under `root`.
pub fn resolve_within(root: &Path, entry: &str) -> Result<PathBuf, BoundaryError> {
    let resolved = resolve_lenient(&root.join(entry));

    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(BoundaryError {
            entry: entry.to_string(),
            root: root.to_path_buf(),
            reason: BoundaryReason::Escapes(resolved),
        })
    }
}

/// Reject absolute entries and entries with `..` components before any
/// resolution takes place.
///
/// # Errors
///
/// Returns [`BoundaryError`] with [`BoundaryReason::Absolute`] or
/// [`BoundaryReason::Traversal`].
pub fn reject_unsafe_relative(root: &Path, entry: &str) -> Result<(), BoundaryError> {
    let path = Path::new(entry);
    let reject = |reason| BoundaryError {
        entry: entry.to_string(),
        root: root.to_path_buf(),
        reason,
    };

    if path.is_absolute() || path.has_root() || entry.starts_with('/') || entry.starts_with('\\')
    {
        return Err(reject(BoundaryReason::Absolute));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => return Err(reject(BoundaryReason::Traversal)),
            Component::Prefix(_) | Component::RootDir => {
                return Err(reject(BoundaryReason::Absolute))
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}

/// Canonicalize the longest existing ancestor of `path` and append the rest.
///
/// `.` and `..` are first removed lexically so that non-existent components
/// cannot hide a traversal.
#[must_use]
pub fn resolve_lenient(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    let mut existing = normalized.clone();
    let mut tail = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut out = canonical;
            for name in tail.iter().rev() {
                out.push(name);
            }
            return out;
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => return normalized,
        }
    }
}

/// Remove `.` and `..` components without touching the filesystem.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
