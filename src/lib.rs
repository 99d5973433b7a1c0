//! VaultDigest - incremental note summarizer
//!
//! Discovers Markdown notes changed since the last successful run, summarizes
//! each one through an LLM (caching the result per file version), and writes a
//! dated digest note back into the vault.

pub mod atomic;
pub mod cache;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod summarizer;
pub mod transform;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use yansi::Paint;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::VaultWriter;
use crate::pipeline::{Pipeline, PipelineConfig, RunOutcome, RunReport};
use crate::progress::Progress;
use crate::scanner::FileCandidate;
use crate::transform::{create_transformer, TransformError, Transformer};

/// Run the application for parsed CLI arguments.
///
/// # Errors
///
/// Returns any fatal error; use [`ExitCode::for_error`] to map it.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let handler = signal::install_handler()?;

    let show_progress = !(cli.quiet || cli.no_progress || cli.dry_run);
    let progress = Arc::new(Progress::with_accessible(!show_progress, cli.accessible));

    let mut pipeline_config = PipelineConfig::new(&config.vault_path)
        .with_discovery(config.discovery())
        .with_cache_dir(&config.cache_dir)
        .with_state_path(&config.state_path)
        .with_max_input_chars(config.max_input_chars)
        .with_config_since(config.since_iso.clone())
        .with_dry_run(cli.dry_run)
        .with_no_cache(cli.no_cache)
        .with_shutdown_flag(handler.flag())
        .with_progress_callback(progress);
    if let Some(since) = cli.since {
        pipeline_config = pipeline_config.with_since(since);
    }

    // A dry run never reaches the transformer, so it must not need credentials.
    let transformer: Box<dyn Transformer> = if cli.dry_run {
        Box::new(|_: &str, _: &str| -> Result<String, TransformError> {
            Err(TransformError::Config(
                "transformer is disabled during a dry run".to_string(),
            ))
        })
    } else {
        create_transformer(&config).context("Failed to set up the LLM backend")?
    };
    let writer = VaultWriter::new(&config.vault_path, &config.digest_folder);

    let outcome = Pipeline::new(pipeline_config, transformer.as_ref(), &writer)
        .run()
        .context("Digest run failed")?;

    Ok(match outcome {
        RunOutcome::Completed(report) => {
            print_report(&report, cli.quiet);
            ExitCode::Success
        }
        RunOutcome::NoCandidates => {
            if !cli.quiet {
                println!("{}", "No new or changed notes since the cutoff.".yellow());
            }
            ExitCode::NoCandidates
        }
        RunOutcome::DryRun(candidates) => {
            print_dry_run(&config.vault_path, &candidates);
            ExitCode::Success
        }
    })
}

fn print_report(report: &RunReport, quiet: bool) {
    if quiet {
        return;
    }
    println!(
        "{} {}",
        "Wrote digest:".green().bold(),
        report.digest_path.display()
    );
    println!(
        "  {} notes ({} new, {} cached, {} skipped)",
        report.summarized(),
        report.produced,
        report.cached,
        report.skipped.len()
    );
    for path in &report.skipped {
        println!("  {} {}", "skipped".yellow(), path.display());
    }
}

fn print_dry_run(vault: &Path, candidates: &[FileCandidate]) {
    let root = vault.canonicalize().unwrap_or_else(|_| vault.to_path_buf());
    for candidate in candidates {
        let shown = candidate.path.strip_prefix(&root).unwrap_or(&candidate.path);
        println!(
            "{}  {}",
            candidate.modified_utc().format("%Y-%m-%d %H:%M").dim(),
            shown.display()
        );
    }
    println!(
        "{}",
        format!("{} notes would be summarized (dry run)", candidates.len()).bold()
    );
}
