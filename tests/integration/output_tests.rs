use std::fs;

use chrono::{NaiveDate, Utc};
use vaultdigest::output::{format_digest, Digest, DigestWriter, OutputError, VaultWriter};
use vaultdigest::summarizer::{NoteSummary, SummaryEntry};

use super::common::Sandbox;

fn entry(name: &str, tag: Option<&str>) -> SummaryEntry {
    SummaryEntry::new(
        NoteSummary {
            summary: format!("About {name}"),
            bullets: vec!["first".to_string(), "second".to_string()],
            why_it_matters: "context".to_string(),
            tags: tag.map(|t| vec![t.to_string()]).unwrap_or_default(),
            notable_quote: None,
        },
        format!("/vault/Clippings/{name}.md").into(),
        Utc::now(),
    )
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

#[test]
fn test_digest_written_into_vault() {
    let sandbox = Sandbox::new();
    let digest = Digest::new(
        date(),
        vec![entry("ownership", Some("rust")), entry("untagged", None)],
        Some("Two themes today.".to_string()),
    );
    let writer = VaultWriter::new(sandbox.vault.path(), "Daily Digests");

    writer.check().unwrap();
    let path = writer.write(digest.date, &format_digest(&digest)).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(path.ends_with("Daily Digests/2025-03-01-digest.md"));
    assert!(content.starts_with("---\n"));
    assert!(content.contains("## Rust"));
    assert!(content.contains("## Uncategorized"));
    assert!(content.contains("[[ownership]]"));
    assert!(content.contains("Two themes today."));
}

#[test]
fn test_single_entry_has_no_insights() {
    let digest = Digest::new(date(), vec![entry("solo", Some("misc"))], None);
    let content = format_digest(&digest);

    assert!(!content.contains("## Top Insights"));
    assert!(content.contains("### Article 1"));
}

#[test]
fn test_rewrite_same_day_keeps_one_file() {
    let sandbox = Sandbox::new();
    let writer = VaultWriter::new(sandbox.vault.path(), "Daily Digests");

    writer.write(date(), "first").unwrap();
    let path = writer.write(date(), "second").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    let count = fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(count, 1);
}

#[test]
fn test_escape_is_rejected_and_nothing_written() {
    let sandbox = Sandbox::new();
    let writer = VaultWriter::new(sandbox.vault.path(), "../../escape");

    let err = writer.write(date(), "content").unwrap_err();

    assert!(matches!(err, OutputError::BoundaryViolation(_)));
    assert_eq!(fs::read_dir(sandbox.vault.path()).unwrap().count(), 0);
}
