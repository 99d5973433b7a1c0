//! Per-item and per-run results.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::scanner::FileCandidate;
use crate::summarizer::SummaryEntry;
use crate::transform::TransformError;

/// Stages of a run, logged on each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Discover,
    Filter,
    DryRunReport,
    ProcessBatch,
    Aggregate,
    Render,
    Persist,
    Advance,
    Done,
    Abort,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Discover => "discover",
            Self::Filter => "filter",
            Self::DryRunReport => "dry-run-report",
            Self::ProcessBatch => "process-batch",
            Self::Aggregate => "aggregate",
            Self::Render => "render",
            Self::Persist => "persist",
            Self::Advance => "advance",
            Self::Done => "done",
            Self::Abort => "abort",
        };
        f.write_str(name)
    }
}

/// Failure while processing a single candidate.
///
/// [`is_recoverable`](Self::is_recoverable) decides whether the run skips the
/// note or aborts.
#[derive(thiserror::Error, Debug)]
pub enum ItemError {
    /// The note could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Note path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The transformer's reply was not JSON, even after the stricter retry.
    #[error("Failed to parse JSON response for {title} after retry: {source} (response: {excerpt:?})")]
    MalformedResponse {
        /// Note title
        title: String,
        /// Start of the last reply
        excerpt: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// The reply was JSON but not a summary.
    #[error("Invalid summary for {title}: {reason}")]
    InvalidResult {
        /// Note title
        title: String,
        /// What was wrong
        reason: String,
    },

    /// The transformer failed after exhausting its retries.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl ItemError {
    /// Whether the run may skip this note and continue.
    ///
    /// A reply the backend could not decode is a bad result for this note
    /// only; transport and API failures stop the run.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Read { .. } | Self::MalformedResponse { .. } | Self::InvalidResult { .. } => true,
            Self::Transform(TransformError::MalformedResponse(_)) => true,
            Self::Transform(_) => false,
        }
    }
}

/// Result of processing one candidate.
#[derive(Debug)]
pub enum ProcessingOutcome {
    /// Summary taken from the cache.
    Cached(SummaryEntry),
    /// Summary freshly produced by the transformer.
    Produced(SummaryEntry),
    /// Recoverable failure; the note is left out of this digest.
    Skipped {
        /// Note path
        path: PathBuf,
        /// Why it was skipped
        error: ItemError,
    },
    /// Unrecoverable failure; the run must stop.
    Abort {
        /// Note path
        path: PathBuf,
        /// What went wrong
        error: ItemError,
    },
}

impl ProcessingOutcome {
    /// Classify an item failure.
    #[must_use]
    pub fn from_error(path: PathBuf, error: ItemError) -> Self {
        if error.is_recoverable() {
            Self::Skipped { path, error }
        } else {
            Self::Abort { path, error }
        }
    }

    /// The summary, for successful outcomes.
    #[must_use]
    pub fn entry(&self) -> Option<&SummaryEntry> {
        match self {
            Self::Cached(e) | Self::Produced(e) => Some(e),
            Self::Skipped { .. } | Self::Abort { .. } => None,
        }
    }
}

/// Statistics and artifacts of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Where the digest was written
    pub digest_path: PathBuf,
    /// Summaries reused from the cache
    pub cached: usize,
    /// Summaries produced this run
    pub produced: usize,
    /// Notes skipped after a recoverable failure
    pub skipped: Vec<PathBuf>,
    /// New checkpoint value
    pub checkpoint: DateTime<Utc>,
}

impl RunReport {
    /// Number of notes included in the digest.
    #[must_use]
    pub fn summarized(&self) -> usize {
        self.cached + self.produced
    }
}

/// How a run ended without error.
#[derive(Debug)]
pub enum RunOutcome {
    /// A digest was written and the checkpoint advanced.
    Completed(RunReport),
    /// Nothing newer than the cutoff; no side effects.
    NoCandidates,
    /// Candidates that a real run would process; no side effects.
    DryRun(Vec<FileCandidate>),
}
