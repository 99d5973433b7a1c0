use std::fs;

use chrono::Utc;
use vaultdigest::cache::{CacheKey, SummaryCache};
use vaultdigest::pipeline::{Pipeline, RunOutcome};
use vaultdigest::scanner::{DiscoveryConfig, Walker};
use vaultdigest::summarizer::{NoteSummary, SummaryEntry};

use super::common::{FakeTransformer, RecordingWriter, Sandbox};

fn sample() -> NoteSummary {
    NoteSummary {
        summary: "Borrowing rules".to_string(),
        bullets: vec!["one owner".to_string()],
        why_it_matters: "fewer bugs".to_string(),
        tags: vec!["rust".to_string()],
        notable_quote: Some("Fearless".to_string()),
    }
}

#[test]
fn test_entry_survives_new_cache_instance() {
    let sandbox = Sandbox::new();
    let note = sandbox.note("a.md", "body", 10);
    let key = CacheKey::new(&note, 42);
    let entry = SummaryEntry::new(sample(), note.clone(), Utc::now());

    SummaryCache::new(sandbox.cache_dir()).put(&key, &entry).unwrap();
    let loaded: SummaryEntry = SummaryCache::new(sandbox.cache_dir()).get(&key).unwrap();

    assert_eq!(loaded, entry);
}

#[test]
fn test_entry_is_flat_json() {
    let sandbox = Sandbox::new();
    let note = sandbox.note("a.md", "body", 10);
    let key = CacheKey::new(&note, 7);
    let cache = SummaryCache::new(sandbox.cache_dir());
    cache
        .put(&key, &SummaryEntry::new(sample(), note, Utc::now()))
        .unwrap();

    let raw = fs::read_to_string(cache.entry_path(&key)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["summary"], "Borrowing rules");
    assert!(value["path"].is_string());
    assert!(value["mtime_utc"].is_string());
}

#[test]
fn test_corrupt_entry_is_recomputed_by_pipeline() {
    let sandbox = Sandbox::new();
    sandbox.note("a.md", "First", 100);
    let writer = RecordingWriter::default();

    Pipeline::new(sandbox.config(), &FakeTransformer::default(), &writer)
        .run()
        .unwrap();

    let candidate = Walker::new(sandbox.vault.path(), DiscoveryConfig::default())
        .discover()
        .unwrap()
        .remove(0);
    let cache = SummaryCache::new(sandbox.cache_dir());
    let path = cache.entry_path(&CacheKey::new(&candidate.path, candidate.mtime_nanos()));
    fs::write(&path, "{ truncated").unwrap();

    let transformer = FakeTransformer::default();
    let outcome = Pipeline::new(sandbox.config(), &transformer, &writer)
        .run()
        .unwrap();

    match outcome {
        RunOutcome::Completed(report) => assert_eq!(report.produced, 1),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(transformer.note_calls(), 1);
    // The bad entry was replaced with a valid one.
    let key = CacheKey::new(&candidate.path, candidate.mtime_nanos());
    assert!(cache.get::<SummaryEntry>(&key).is_some());
}

#[test]
fn test_key_depends_on_path_and_mtime_only() {
    let sandbox = Sandbox::new();
    let a = sandbox.note("a.md", "one", 10);
    let b = sandbox.note("b.md", "one", 10);

    assert_eq!(CacheKey::new(&a, 1), CacheKey::new(&a, 1));
    assert_ne!(CacheKey::new(&a, 1), CacheKey::new(&b, 1));
    assert_ne!(CacheKey::new(&a, 1), CacheKey::new(&a, 2));
}
