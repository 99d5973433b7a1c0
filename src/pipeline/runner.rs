//! The run state machine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::outcome::{ItemError, ProcessingOutcome, RunOutcome, RunReport, Stage};
use crate::cache::{CacheKey, SummaryCache};
use crate::checkpoint::{resolve_cutoff, CheckpointError, CheckpointState, CheckpointStore};
use crate::output::{format_digest, Digest, DigestWriter, OutputError};
use crate::progress::ProgressCallback;
use crate::scanner::{filter_since, DiscoveryConfig, FileCandidate, ScanError, Walker};
use crate::summarizer::{create_rollup, summarize_note, SummaryEntry};
use crate::transform::{TransformError, Transformer};

/// Progress phase name for the per-note loop.
pub const SUMMARIZE_PHASE: &str = "summarize";

/// Settings for one pipeline run.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Vault root to discover notes under.
    pub vault_root: PathBuf,
    /// Discovery filters.
    pub discovery: DiscoveryConfig,
    /// Directory holding cached summaries.
    pub cache_dir: PathBuf,
    /// Checkpoint file.
    pub state_path: PathBuf,
    /// Characters of note content sent to the transformer.
    pub max_input_chars: usize,
    /// Cutoff passed for this run only; wins over everything else.
    pub since_override: Option<String>,
    /// Cutoff from configuration; wins over the checkpoint.
    pub config_since: Option<String>,
    /// List candidates and stop.
    pub dry_run: bool,
    /// Ignore cached summaries (fresh results are still written back).
    pub no_cache: bool,
    /// Fixed clock for the run; `None` uses the current time.
    pub now: Option<DateTime<Utc>>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("vault_root", &self.vault_root)
            .field("discovery", &self.discovery)
            .field("cache_dir", &self.cache_dir)
            .field("state_path", &self.state_path)
            .field("max_input_chars", &self.max_input_chars)
            .field("since_override", &self.since_override)
            .field("config_since", &self.config_since)
            .field("dry_run", &self.dry_run)
            .field("no_cache", &self.no_cache)
            .field("now", &self.now)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Defaults for a vault: cache and checkpoint live under the current
    /// directory, as they do without a config file.
    #[must_use]
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        Self {
            vault_root: vault_root.into(),
            discovery: DiscoveryConfig::default(),
            cache_dir: PathBuf::from(".cache/summaries"),
            state_path: PathBuf::from("state.json"),
            max_input_chars: 16_000,
            since_override: None,
            config_since: None,
            dry_run: false,
            no_cache: false,
            now: None,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the discovery filters.
    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the checkpoint file.
    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Set the per-note input limit.
    #[must_use]
    pub fn with_max_input_chars(mut self, chars: usize) -> Self {
        self.max_input_chars = chars.max(1);
        self
    }

    /// Set a one-off cutoff (`--since`).
    #[must_use]
    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since_override = Some(since.into());
        self
    }

    /// Set the configured cutoff (`since_iso`).
    #[must_use]
    pub fn with_config_since(mut self, since: Option<String>) -> Self {
        self.config_since = since;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable cache reads.
    #[must_use]
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Pin the run's clock.
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Whether a cutoff was given that does not depend on the checkpoint.
    fn has_explicit_cutoff(&self) -> bool {
        [&self.since_override, &self.config_since]
            .into_iter()
            .flatten()
            .any(|s| !s.trim().is_empty())
    }
}

/// Errors that abort a run.
///
/// None of these advance the checkpoint.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Run interrupted by user")]
    Interrupted,

    /// Discovery failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The checkpoint could not be read, parsed or written.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A note failed in a way that must not be skipped.
    #[error("Aborted while processing {path}: {source}")]
    Item {
        /// Note being processed
        path: PathBuf,
        /// The unrecoverable failure
        #[source]
        source: ItemError,
    },

    /// Every candidate was skipped.
    #[error("All {attempted} candidate notes failed; no digest written")]
    AllCandidatesFailed {
        /// Number of candidates tried
        attempted: usize,
    },

    /// The cross-note rollup could not be produced.
    #[error("Failed to create rollup: {0}")]
    Rollup(#[source] TransformError),

    /// The digest could not be written.
    #[error(transparent)]
    Persist(#[from] OutputError),
}

impl PipelineError {
    /// Whether this error came from a shutdown request.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted | Self::Scan(ScanError::Interrupted))
    }
}

/// Runs discovery, summarization, digest output and checkpointing.
///
/// # Example
///
/// ```no_run
/// use vaultdigest::output::VaultWriter;
/// use vaultdigest::pipeline::{Pipeline, PipelineConfig};
/// use vaultdigest::transform::AnthropicTransformer;
/// use std::time::Duration;
///
/// let transformer =
///     AnthropicTransformer::new("sk-...", "claude-sonnet-4-6", Duration::from_secs(60)).unwrap();
/// let writer = VaultWriter::new("/home/user/vault", "Daily Digests");
/// let config = PipelineConfig::new("/home/user/vault").with_dry_run(true);
///
/// let outcome = Pipeline::new(config, &transformer, &writer).run().unwrap();
/// ```
pub struct Pipeline<'a> {
    config: PipelineConfig,
    transformer: &'a dyn Transformer,
    writer: &'a dyn DigestWriter,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        transformer: &'a dyn Transformer,
        writer: &'a dyn DigestWriter,
    ) -> Self {
        Self {
            config,
            transformer,
            writer,
        }
    }

    /// The run's configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn enter(&self, stage: Stage) {
        log::debug!("Pipeline stage: {}", stage);
    }

    fn abort(&self, error: PipelineError) -> PipelineError {
        self.enter(Stage::Abort);
        error
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for any failure that must not be skipped.
    /// The checkpoint is only written after the digest has been persisted.
    pub fn run(&self) -> Result<RunOutcome, PipelineError> {
        let config = &self.config;
        let now = config.now.unwrap_or_else(Utc::now);

        self.enter(Stage::Init);
        let store = CheckpointStore::new(&config.state_path);
        let state = match store.load() {
            Ok(state) => state,
            Err(e @ CheckpointError::Corrupt { .. }) if config.has_explicit_cutoff() => {
                log::warn!("{}; using the explicit cutoff and rewriting it after this run", e);
                CheckpointState::first_run()
            }
            Err(e) => return Err(e.into()),
        };
        let cutoff = resolve_cutoff(
            config.since_override.as_deref(),
            config.config_since.as_deref(),
            &state,
            now,
        )?;
        log::info!(
            "Processing notes modified after {} ({:?})",
            cutoff.at.to_rfc3339(),
            cutoff.source
        );

        self.writer.check()?;

        self.enter(Stage::Discover);
        let mut walker = Walker::new(&config.vault_root, config.discovery.clone());
        if let Some(ref flag) = config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }
        let discovered = walker.discover().map_err(|e| match e {
            ScanError::Interrupted => self.abort(PipelineError::Interrupted),
            other => self.abort(other.into()),
        })?;

        self.enter(Stage::Filter);
        let total = discovered.len();
        let candidates = filter_since(discovered, cutoff.at);
        log::info!(
            "Found {} candidate notes ({} discovered)",
            candidates.len(),
            total
        );

        if candidates.is_empty() {
            self.enter(Stage::Done);
            return Ok(RunOutcome::NoCandidates);
        }

        if config.dry_run {
            self.enter(Stage::DryRunReport);
            return Ok(RunOutcome::DryRun(candidates));
        }

        self.enter(Stage::ProcessBatch);
        let cache = SummaryCache::new(&config.cache_dir);
        let batch = self.process_batch(&cache, &candidates)?;

        self.enter(Stage::Aggregate);
        let rollup = if batch.entries.len() > 1 {
            let summaries: Vec<_> = batch.entries.iter().map(|e| &e.result).collect();
            Some(
                create_rollup(self.transformer, &summaries)
                    .map_err(|e| self.abort(PipelineError::Rollup(e)))?,
            )
        } else {
            None
        };
        let digest = Digest::new(now.date_naive(), batch.entries, rollup);

        self.enter(Stage::Render);
        let content = format_digest(&digest);

        self.enter(Stage::Persist);
        let digest_path = self
            .writer
            .write(digest.date, &content)
            .map_err(|e| self.abort(e.into()))?;

        self.enter(Stage::Advance);
        let mut state = state;
        state.advance(now);
        store.save(&state).map_err(|e| self.abort(e.into()))?;

        self.enter(Stage::Done);
        log::info!(
            "Digest complete: {} notes ({} cached, {} new, {} skipped)",
            digest.len(),
            batch.cached,
            batch.produced,
            batch.skipped.len()
        );

        Ok(RunOutcome::Completed(RunReport {
            digest_path,
            cached: batch.cached,
            produced: batch.produced,
            skipped: batch.skipped,
            checkpoint: now,
        }))
    }

    fn process_batch(
        &self,
        cache: &SummaryCache,
        candidates: &[FileCandidate],
    ) -> Result<Batch, PipelineError> {
        let progress = self.config.progress_callback.as_ref();
        let mut batch = Batch::default();

        if let Some(cb) = progress {
            cb.on_phase_start(SUMMARIZE_PHASE, candidates.len());
        }

        for (i, candidate) in candidates.iter().enumerate() {
            if self.config.is_shutdown_requested() {
                log::info!("Shutdown requested, stopping before {}", candidate.path.display());
                return Err(self.abort(PipelineError::Interrupted));
            }

            if let Some(cb) = progress {
                cb.on_progress(i + 1, &candidate.path.to_string_lossy());
            }

            match self.process_candidate(cache, candidate) {
                ProcessingOutcome::Cached(entry) => {
                    log::debug!("Cache hit: {}", candidate.path.display());
                    if let Some(cb) = progress {
                        cb.on_message("cached");
                    }
                    batch.cached += 1;
                    batch.entries.push(entry);
                }
                ProcessingOutcome::Produced(entry) => {
                    log::info!("Summarized {}", candidate.path.display());
                    if let Some(cb) = progress {
                        cb.on_message("summarized");
                    }
                    batch.produced += 1;
                    batch.entries.push(entry);
                }
                ProcessingOutcome::Skipped { path, error } => {
                    log::warn!("Skipping {}: {}", path.display(), error);
                    if let Some(cb) = progress {
                        cb.on_message("skipped");
                    }
                    batch.skipped.push(path);
                }
                ProcessingOutcome::Abort { path, error } => {
                    log::error!("Aborting at {}: {}", path.display(), error);
                    return Err(self.abort(PipelineError::Item {
                        path,
                        source: error,
                    }));
                }
            }

            if let Some(cb) = progress {
                cb.on_item_completed(candidate.size);
            }
        }

        if let Some(cb) = progress {
            cb.on_phase_end(SUMMARIZE_PHASE);
        }

        if batch.entries.is_empty() {
            return Err(self.abort(PipelineError::AllCandidatesFailed {
                attempted: candidates.len(),
            }));
        }

        Ok(batch)
    }

    fn process_candidate(
        &self,
        cache: &SummaryCache,
        candidate: &FileCandidate,
    ) -> ProcessingOutcome {
        let key = CacheKey::new(&candidate.path, candidate.mtime_nanos());

        if !self.config.no_cache {
            if let Some(entry) = cache.get::<SummaryEntry>(&key) {
                return ProcessingOutcome::Cached(entry);
            }
        }

        match self.summarize(&candidate.path, &candidate.title()) {
            Ok(summary) => {
                let entry = SummaryEntry::new(
                    summary,
                    candidate.path.clone(),
                    candidate.modified_utc(),
                );
                if let Err(e) = cache.put(&key, &entry) {
                    log::warn!("Failed to cache summary for {}: {}", candidate.path.display(), e);
                }
                ProcessingOutcome::Produced(entry)
            }
            Err(error) => ProcessingOutcome::from_error(candidate.path.clone(), error),
        }
    }

    fn summarize(
        &self,
        path: &Path,
        title: &str,
    ) -> Result<crate::summarizer::NoteSummary, ItemError> {
        let bytes = std::fs::read(path).map_err(|source| ItemError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);

        summarize_note(self.transformer, &content, title, self.config.max_input_chars)
    }
}

#[derive(Default)]
struct Batch {
    entries: Vec<SummaryEntry>,
    cached: usize,
    produced: usize,
    skipped: Vec<PathBuf>,
}
