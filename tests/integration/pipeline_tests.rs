use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use vaultdigest::checkpoint::{CheckpointError, CheckpointStore};
use vaultdigest::output::{OutputError, VaultWriter};
use vaultdigest::pipeline::{Pipeline, PipelineConfig, PipelineError, RunOutcome};
use vaultdigest::progress::ProgressCallback;
use vaultdigest::scanner::{DiscoveryConfig, ScanError};

use super::common::{now, set_age, FakeTransformer, RecordingWriter, Sandbox};

fn completed(outcome: RunOutcome) -> vaultdigest::pipeline::RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        other => panic!("expected a completed run, got {other:?}"),
    }
}

#[test]
fn test_recoverable_failure_is_skipped() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First note", 300);
    let broken = sandbox.note("b.md", "BROKEN note", 200);
    sandbox.note("c.md", "Third note", 100);
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let report = completed(
        Pipeline::new(sandbox.config(), &transformer, &writer)
            .run()
            .unwrap(),
    );

    assert_eq!(report.produced, 2);
    assert_eq!(report.cached, 0);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].ends_with(broken.file_name().unwrap()));
    assert_eq!(writer.count(), 1);
    assert!(writer.last().contains("articles_count: 2"));
    assert_eq!(sandbox.cache_files(), 2);

    let state = CheckpointStore::new(sandbox.state_path()).load().unwrap();
    assert_eq!(state.last_run, Some(now()));
}

#[test]
fn test_undecodable_reply_is_skipped() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First note", 300);
    let empty = sandbox.note("b.md", "EMPTY reply", 200);
    sandbox.note("c.md", "Third note", 100);
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let report = completed(
        Pipeline::new(sandbox.config(), &transformer, &writer)
            .run()
            .unwrap(),
    );

    assert_eq!(report.produced, 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].ends_with(empty.file_name().unwrap()));
    assert!(writer.last().contains("articles_count: 2"));
    assert!(sandbox.state_path().exists());
}

/// Removes a note once discovery is over, so reading it fails.
struct RemoveBeforeSummarize {
    target: Mutex<Option<PathBuf>>,
}

impl ProgressCallback for RemoveBeforeSummarize {
    fn on_phase_start(&self, _phase: &str, _total: usize) {
        if let Some(path) = self.target.lock().unwrap().take() {
            fs::remove_file(path).unwrap();
        }
    }

    fn on_progress(&self, _current: usize, _path: &str) {}

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_unreadable_note_is_skipped() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First note", 300);
    let vanished = sandbox.note("b.md", "Second note", 200);
    sandbox.note("c.md", "Third note", 100);
    let callback = Arc::new(RemoveBeforeSummarize {
        target: Mutex::new(Some(vanished.clone())),
    });
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let report = completed(
        Pipeline::new(
            sandbox.config().with_progress_callback(callback),
            &transformer,
            &writer,
        )
        .run()
        .unwrap(),
    );

    assert_eq!(report.produced, 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].ends_with(vanished.file_name().unwrap()));
    assert_eq!(transformer.note_calls(), 2);
    assert_eq!(writer.count(), 1);
}

#[test]
fn test_no_candidates_has_no_side_effects() {
    let sandbox = Sandbox::new();
    sandbox.note("old.md", "Old note", 3 * 86_400);
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let outcome = Pipeline::new(sandbox.config(), &transformer, &writer)
        .run()
        .unwrap();

    assert!(matches!(outcome, RunOutcome::NoCandidates));
    assert_eq!(transformer.calls.get(), 0);
    assert_eq!(writer.count(), 0);
    assert!(!sandbox.state_path().exists());
}

#[test]
fn test_empty_vault_is_no_candidates() {
    let sandbox = Sandbox::new();
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let outcome = Pipeline::new(sandbox.config(), &transformer, &writer)
        .run()
        .unwrap();

    assert!(matches!(outcome, RunOutcome::NoCandidates));
}

#[test]
fn test_all_failed_is_an_error() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "BROKEN one", 200);
    sandbox.note("b.md", "BROKEN two", 100);
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let err = Pipeline::new(sandbox.config(), &transformer, &writer)
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::AllCandidatesFailed { attempted: 2 }
    ));
    // Each note is tried twice: the normal prompt and the stricter retry.
    assert_eq!(transformer.calls.get(), 4);
    assert_eq!(writer.count(), 0);
    assert!(!sandbox.state_path().exists());
}

#[test]
fn test_dry_run_touches_nothing() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 200);
    sandbox.note("b.md", "Second", 100);
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let outcome = Pipeline::new(sandbox.config().with_dry_run(true), &transformer, &writer)
        .run()
        .unwrap();

    match outcome {
        RunOutcome::DryRun(candidates) => {
            let names: Vec<_> = candidates
                .iter()
                .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            assert_eq!(names, vec!["a.md", "b.md"]);
        }
        other => panic!("expected dry run, got {other:?}"),
    }
    assert_eq!(transformer.calls.get(), 0);
    assert_eq!(writer.count(), 0);
    assert!(!sandbox.cache_dir().exists());
    assert!(!sandbox.state_path().exists());
}

#[test]
fn test_second_run_uses_cache() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 200);
    sandbox.note("b.md", "Second", 100);
    let writer = RecordingWriter::default();

    let first = FakeTransformer::default();
    completed(Pipeline::new(sandbox.config(), &first, &writer).run().unwrap());
    assert_eq!(first.note_calls(), 2);

    let second = FakeTransformer::default();
    let report = completed(Pipeline::new(sandbox.config(), &second, &writer).run().unwrap());

    assert_eq!(report.cached, 2);
    assert_eq!(report.produced, 0);
    assert_eq!(second.note_calls(), 0);
    // The rollup is rebuilt from cached summaries.
    assert_eq!(second.rollups.get(), 1);
}

#[test]
fn test_mtime_change_invalidates_cache() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 200);
    let edited = sandbox.note("b.md", "Second", 100);
    let writer = RecordingWriter::default();

    completed(
        Pipeline::new(sandbox.config(), &FakeTransformer::default(), &writer)
            .run()
            .unwrap(),
    );

    fs::write(&edited, "Second, edited").unwrap();
    set_age(&edited, 50);

    let transformer = FakeTransformer::default();
    let report = completed(
        Pipeline::new(sandbox.config(), &transformer, &writer)
            .run()
            .unwrap(),
    );

    assert_eq!(report.cached, 1);
    assert_eq!(report.produced, 1);
    assert_eq!(transformer.note_calls(), 1);
    assert_eq!(sandbox.cache_files(), 3);
}

#[test]
fn test_no_cache_resummarizes() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    let writer = RecordingWriter::default();

    completed(
        Pipeline::new(sandbox.config(), &FakeTransformer::default(), &writer)
            .run()
            .unwrap(),
    );

    let transformer = FakeTransformer::default();
    let report = completed(
        Pipeline::new(sandbox.config().with_no_cache(true), &transformer, &writer)
            .run()
            .unwrap(),
    );

    assert_eq!(report.produced, 1);
    assert_eq!(transformer.note_calls(), 1);
}

#[test]
fn test_unrecoverable_error_aborts_without_output() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "Fine note", 300);
    let fatal = sandbox.note("b.md", "FATAL note", 200);
    sandbox.note("c.md", "Never reached", 100);
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let err = Pipeline::new(sandbox.config(), &transformer, &writer)
        .run()
        .unwrap_err();

    match err {
        PipelineError::Item { path, source } => {
            assert!(path.ends_with(fatal.file_name().unwrap()));
            assert!(!source.is_recoverable());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transformer.calls.get(), 2);
    assert_eq!(writer.count(), 0);
    assert!(!sandbox.state_path().exists());
    // Work done before the failure is kept for the next run.
    assert_eq!(sandbox.cache_files(), 1);
}

#[test]
fn test_persist_failure_keeps_checkpoint() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::failing();

    let err = Pipeline::new(sandbox.config(), &transformer, &writer)
        .run()
        .unwrap_err();

    assert!(matches!(err, PipelineError::Persist(OutputError::Io { .. })));
    assert!(!sandbox.state_path().exists());
}

#[test]
fn test_checkpoint_drives_next_run() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    let writer = RecordingWriter::default();
    let config = || checkpoint_only_config(&sandbox);

    // First run ever: the cutoff defaults to now, so nothing is retroactive.
    let outcome = Pipeline::new(config(), &FakeTransformer::default(), &writer)
        .run()
        .unwrap();
    assert!(matches!(outcome, RunOutcome::NoCandidates));

    // A one-off --since processes the note and advances the checkpoint.
    completed(
        Pipeline::new(config().with_since("2025-03-01"), &FakeTransformer::default(), &writer)
            .run()
            .unwrap(),
    );

    // Without an override the checkpoint (== now) is used again.
    let outcome = Pipeline::new(config(), &FakeTransformer::default(), &writer)
        .run()
        .unwrap();
    assert!(matches!(outcome, RunOutcome::NoCandidates));
}

#[test]
fn test_digest_follows_discovery_order() {
    let sandbox = Sandbox::new();
    sandbox.note("zeta.md", "Oldest", 300);
    sandbox.note("alpha.md", "Newest", 100);
    sandbox.note("mid.md", "Middle", 200);
    let writer = RecordingWriter::default();

    completed(
        Pipeline::new(sandbox.config(), &FakeTransformer::default(), &writer)
            .run()
            .unwrap(),
    );

    let digest = writer.last();
    let zeta = digest.find("Summary of zeta").unwrap();
    let mid = digest.find("Summary of mid").unwrap();
    let alpha = digest.find("Summary of alpha").unwrap();
    assert!(zeta < mid && mid < alpha);
    assert!(digest.contains("## Top Insights"));
    assert!(digest.contains("Rollup of everything"));
}

fn checkpoint_only_config(sandbox: &Sandbox) -> PipelineConfig {
    PipelineConfig::new(sandbox.vault.path())
        .with_cache_dir(sandbox.cache_dir())
        .with_state_path(sandbox.state_path())
        .with_now(now())
}

#[test]
fn test_corrupt_checkpoint_is_fatal() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    fs::write(sandbox.state_path(), "{not json").unwrap();
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let err = Pipeline::new(checkpoint_only_config(&sandbox), &transformer, &writer)
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Checkpoint(CheckpointError::Corrupt { .. })
    ));
    assert!(err.to_string().contains("--since"));
    assert_eq!(transformer.calls.get(), 0);
    assert_eq!(fs::read_to_string(sandbox.state_path()).unwrap(), "{not json");
}

#[test]
fn test_since_recovers_from_corrupt_checkpoint() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    fs::write(sandbox.state_path(), "{not json").unwrap();
    let writer = RecordingWriter::default();

    let report = completed(
        Pipeline::new(
            checkpoint_only_config(&sandbox).with_since("2025-01-01"),
            &FakeTransformer::default(),
            &writer,
        )
        .run()
        .unwrap(),
    );

    assert_eq!(report.produced, 1);
    let state = CheckpointStore::new(sandbox.state_path()).load().unwrap();
    assert_eq!(state.last_run, Some(now()));
}

#[test]
fn test_include_folder_escape_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    let discovery = DiscoveryConfig {
        include_folders: vec!["../elsewhere".to_string()],
        ..DiscoveryConfig::default()
    };
    let transformer = FakeTransformer::default();
    let writer = RecordingWriter::default();

    let err = Pipeline::new(
        sandbox.config().with_discovery(discovery),
        &transformer,
        &writer,
    )
    .run()
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Scan(ScanError::BoundaryViolation(_))
    ));
    assert_eq!(transformer.calls.get(), 0);
}

#[test]
fn test_bad_digest_folder_fails_before_processing() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    let transformer = FakeTransformer::default();
    let writer = VaultWriter::new(sandbox.vault.path(), "../outside");

    let err = Pipeline::new(sandbox.config(), &transformer, &writer)
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Persist(OutputError::BoundaryViolation(_))
    ));
    assert_eq!(transformer.calls.get(), 0);
    assert_eq!(sandbox.cache_files(), 0);
}

#[test]
fn test_end_to_end_with_vault_writer() {
    let sandbox = Sandbox::new();
    sandbox.note("Clippings/rust.md", "---\nsource: web\n---\nOwnership", 200);
    sandbox.note("Clippings/go.md", "Goroutines", 100);
    let transformer = FakeTransformer::default();
    let writer = VaultWriter::new(sandbox.vault.path(), "Daily Digests");

    let report = completed(
        Pipeline::new(sandbox.config(), &transformer, &writer)
            .run()
            .unwrap(),
    );

    assert!(report.digest_path.ends_with("Daily Digests/2025-03-01-digest.md"));
    let content = fs::read_to_string(&report.digest_path).unwrap();
    assert!(content.contains("# Daily Digest — March 01, 2025"));
    assert!(content.contains("[[rust]]"));
    assert!(content.contains("[[go]]"));
}
