//! Checkpoint module for persisting the "last successful run" timestamp.
//!
//! The checkpoint bounds discovery: only notes modified after the resolved
//! cutoff are processed. It is advanced only after a digest has been durably
//! written, so an interrupted or failed run is retried from the previous
//! checkpoint on the next invocation.
//!
//! # Architecture
//!
//! * [`data`]: The serializable [`CheckpointState`], timestamp parsing and
//!   cutoff resolution.
//! * [`io`]: The [`CheckpointStore`] that loads and atomically saves the state.
//!
//! # Corruption
//!
//! A checkpoint file that exists but cannot be parsed is a hard error
//! ([`CheckpointError::Corrupt`]). Falling back to first-run semantics would
//! silently move the cutoff to "now" and skip every note changed since the
//! last good run.

pub mod data;
pub mod io;

use std::path::PathBuf;

pub use data::{parse_timestamp, resolve_cutoff, CheckpointState, Cutoff, CutoffSource};
pub use io::CheckpointStore;

/// Errors raised while loading, saving, or interpreting the checkpoint.
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// The checkpoint file exists but could not be parsed.
    #[error("Checkpoint file {} is corrupt: {source}. Fix or remove it, or pass --since explicitly.", path.display())]
    Corrupt {
        /// Path of the checkpoint file
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The checkpoint file could not be read or written.
    #[error("I/O error for checkpoint {}: {source}", path.display())]
    Io {
        /// Path of the checkpoint file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A timestamp override could not be parsed as ISO-8601.
    #[error("Invalid ISO-8601 timestamp: '{0}'")]
    InvalidTimestamp(String),
}
