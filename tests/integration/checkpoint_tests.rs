use std::fs;

use chrono::Duration;
use vaultdigest::checkpoint::{
    resolve_cutoff, CheckpointError, CheckpointState, CheckpointStore, CutoffSource,
};

use super::common::{now, Sandbox};

#[test]
fn test_save_replaces_previous_state() {
    let sandbox = Sandbox::new();
    let store = CheckpointStore::new(sandbox.state_path());

    let mut state = CheckpointState::first_run();
    state.advance(now() - Duration::days(1));
    store.save(&state).unwrap();
    state.advance(now());
    store.save(&state).unwrap();

    assert_eq!(store.load().unwrap().last_run, Some(now()));
    let leftovers: Vec<_> = fs::read_dir(sandbox.work.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("state.json")]);
}

#[test]
fn test_save_creates_parent_directories() {
    let sandbox = Sandbox::new();
    let path = sandbox.work.path().join("nested").join("dir").join("state.json");
    let store = CheckpointStore::new(&path);

    let mut state = CheckpointState::first_run();
    state.advance(now());
    store.save(&state).unwrap();

    assert!(path.is_file());
}

#[test]
fn test_cutoff_sources_in_priority_order() {
    let mut state = CheckpointState::first_run();

    let cutoff = resolve_cutoff(None, None, &state, now()).unwrap();
    assert_eq!(cutoff.source, CutoffSource::Default);
    assert_eq!(cutoff.at, now());

    state.advance(now() - Duration::hours(6));
    let cutoff = resolve_cutoff(None, None, &state, now()).unwrap();
    assert_eq!(cutoff.source, CutoffSource::Checkpoint);
    assert_eq!(cutoff.at, now() - Duration::hours(6));

    let cutoff = resolve_cutoff(None, Some("2025-02-01"), &state, now()).unwrap();
    assert_eq!(cutoff.source, CutoffSource::Config);

    let cutoff =
        resolve_cutoff(Some("2025-01-01T00:00:00Z"), Some("2025-02-01"), &state, now()).unwrap();
    assert_eq!(cutoff.source, CutoffSource::Override);
    assert_eq!(cutoff.at.to_rfc3339(), "2025-01-01T00:00:00+00:00");
}

#[test]
fn test_invalid_override_is_rejected() {
    let err = resolve_cutoff(Some("yesterday"), None, &CheckpointState::first_run(), now())
        .unwrap_err();
    assert!(matches!(err, CheckpointError::InvalidTimestamp(_)));
}

#[test]
fn test_corrupt_file_is_an_error_not_a_first_run() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.state_path(), r#"{"last_run_iso": 17}"#).unwrap();

    let err = CheckpointStore::new(sandbox.state_path()).load().unwrap_err();
    assert!(matches!(err, CheckpointError::Corrupt { .. }));
}
