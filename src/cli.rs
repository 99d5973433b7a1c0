//! Command-line interface definitions for VaultDigest.
//!
//! # Example
//!
//! ```bash
//! # Summarize everything changed since the last successful run
//! vaultdigest
//!
//! # Use a specific config file and a fixed cutoff
//! vaultdigest --config ~/notes/vaultdigest.toml --since 2025-01-01
//!
//! # See which notes would be summarized, without calling the LLM
//! vaultdigest --dry-run
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::checkpoint::parse_timestamp;

/// Summarize new and changed notes into a daily digest inside your vault.
///
/// Only notes modified after the last successful run are processed, and
/// summaries are cached so unchanged notes are never sent twice.
#[derive(Debug, Parser)]
#[command(name = "vaultdigest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config file [default: ./vaultdigest.toml]
    #[arg(short, long, value_name = "PATH", env = "VAULTDIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Process notes modified after this time instead of the last run
    ///
    /// Accepts YYYY-MM-DD or an ISO-8601 date-time; values without an offset
    /// are taken as UTC.
    #[arg(long, value_name = "DATE", value_parser = parse_since)]
    pub since: Option<String>,

    /// List the notes that would be summarized and exit
    ///
    /// Reads no cache entries, makes no LLM calls and writes nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore cached summaries and summarize every candidate again
    #[arg(long)]
    pub no_cache: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Use ASCII-only progress output with less frequent redraws
    #[arg(long, env = "VAULTDIGEST_ACCESSIBLE")]
    pub accessible: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Validate `--since` up front so typos fail before any work starts.
fn parse_since(s: &str) -> Result<String, String> {
    parse_timestamp(s)
        .map(|_| s.trim().to_string())
        .map_err(|e| e.to_string())
}
