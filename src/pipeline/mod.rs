//! Incremental summarization pipeline.
//!
//! # Overview
//!
//! One run walks through these stages, strictly in order:
//! 1. **Init**: load the checkpoint and resolve the cutoff
//! 2. **Discover** / **Filter**: collect candidate notes newer than the cutoff
//! 3. **ProcessBatch**: for each candidate, reuse a cached summary or ask the
//!    transformer for a new one
//! 4. **Aggregate** / **Render** / **Persist**: build the digest and write it
//! 5. **Advance**: move the checkpoint forward
//!
//! A failure in any stage before **Advance** leaves the checkpoint untouched,
//! so the next run sees the same candidates again. Summaries produced before
//! the failure are already cached and are not paid for twice.
//!
//! # Example
//!
//! ```no_run
//! use vaultdigest::output::VaultWriter;
//! use vaultdigest::pipeline::{Pipeline, PipelineConfig, RunOutcome};
//! use vaultdigest::transform::TransformError;
//!
//! let transformer = |_: &str, _: &str| -> Result<String, TransformError> {
//!     Ok(r#"{"summary": "stub"}"#.to_string())
//! };
//! let writer = VaultWriter::new("/home/user/vault", "Daily Digests");
//! let config = PipelineConfig::new("/home/user/vault").with_since("2025-01-01");
//!
//! match Pipeline::new(config, &transformer, &writer).run() {
//!     Ok(RunOutcome::Completed(report)) => println!("{} notes", report.summarized()),
//!     Ok(other) => println!("{other:?}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

pub mod outcome;
pub mod runner;

pub use outcome::{ItemError, ProcessingOutcome, RunOutcome, RunReport, Stage};
pub use runner::{Pipeline, PipelineConfig, PipelineError};
