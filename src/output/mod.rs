//! Digest rendering and persistence.
//!
//! A run's successful summaries are collected into a [`Digest`], rendered to
//! Markdown by [`markdown::format_digest`], and handed to a [`DigestWriter`].
//! The vault implementation, [`writer::VaultWriter`], refuses any destination
//! that would leave the vault.
//!
//! # Example
//!
//! ```no_run
//! use vaultdigest::output::{Digest, DigestWriter, VaultWriter};
//! use vaultdigest::output::markdown::format_digest;
//!
//! let digest = Digest::new(chrono::Utc::now().date_naive(), Vec::new(), None);
//! let writer = VaultWriter::new("/home/user/vault", "Daily Digests");
//! let path = writer.write(digest.date, &format_digest(&digest)).unwrap();
//! println!("Wrote {}", path.display());
//! ```

pub mod markdown;
pub mod writer;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::scanner::BoundaryError;
use crate::summarizer::SummaryEntry;

pub use markdown::{format_digest, MarkdownDigest};
pub use writer::VaultWriter;

/// Aggregated result of one run, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    /// Day the digest is filed under
    pub date: NaiveDate,
    /// Successful summaries, oldest note first
    pub entries: Vec<SummaryEntry>,
    /// Cross-note overview, present when there is more than one entry
    pub rollup: Option<String>,
}

impl Digest {
    /// Create a digest.
    #[must_use]
    pub fn new(date: NaiveDate, entries: Vec<SummaryEntry>, rollup: Option<String>) -> Self {
        Self {
            date,
            entries,
            rollup,
        }
    }

    /// Number of summarized notes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the digest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors that can occur while persisting a digest.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// The configured destination would leave the vault.
    #[error(transparent)]
    BoundaryViolation(#[from] BoundaryError),

    /// The vault root itself could not be resolved.
    #[error("Vault not accessible: {path}: {source}")]
    VaultNotAccessible {
        /// Vault root as configured
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing the digest failed.
    #[error("Failed to write digest to {path}: {source}")]
    Io {
        /// Destination file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Destination for rendered digests.
pub trait DigestWriter {
    /// Verify the destination is usable without writing anything.
    ///
    /// Called before any processing so that a bad destination fails the run
    /// early.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if a later [`write`](Self::write) is certain to fail.
    fn check(&self) -> Result<(), OutputError> {
        Ok(())
    }

    /// Persist `content` as the digest for `date`, returning where it landed.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the destination is rejected or the write fails.
    fn write(&self, date: NaiveDate, content: &str) -> Result<PathBuf, OutputError>;
}
