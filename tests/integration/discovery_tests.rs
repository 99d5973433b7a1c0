use std::fs;

use chrono::Duration;
use vaultdigest::scanner::{filter_since, DiscoveryConfig, FileCandidate, ScanError, Walker};

use super::common::{now, Sandbox};

fn names(files: &[FileCandidate]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Clippings/ and Journal/ with a template folder and an attachment.
fn vault() -> Sandbox {
    let sandbox = Sandbox::new();
    sandbox.note("Clippings/rust.md", "ownership", 500);
    sandbox.note("Clippings/go.MD", "goroutines", 400);
    sandbox.note("Clippings/image.png", "binary", 300);
    sandbox.note("Journal/today.md", "dear diary", 200);
    sandbox.note("Templates/daily.md", "{{date}}", 100);
    sandbox.note("Clippings/empty.md", "", 50);
    sandbox
}

#[test]
fn test_realistic_vault_layout() {
    let sandbox = vault();
    let config = DiscoveryConfig {
        exclude_globs: vec!["Templates".to_string()],
        ..DiscoveryConfig::default()
    };

    let files = Walker::new(sandbox.vault.path(), config).discover().unwrap();

    assert_eq!(names(&files), vec!["rust.md", "go.MD", "today.md"]);
}

#[test]
fn test_include_folder_restricts_walk() {
    let sandbox = vault();
    let config = DiscoveryConfig {
        include_folders: vec!["Journal".to_string()],
        ..DiscoveryConfig::default()
    };

    let files = Walker::new(sandbox.vault.path(), config).discover().unwrap();

    assert_eq!(names(&files), vec!["today.md"]);
}

#[test]
fn test_glob_exclusion_of_single_file() {
    let sandbox = vault();
    let config = DiscoveryConfig {
        exclude_globs: vec!["Clippings/r*.md".to_string(), "Templates/**".to_string()],
        ..DiscoveryConfig::default()
    };

    let files = Walker::new(sandbox.vault.path(), config).discover().unwrap();

    assert_eq!(names(&files), vec!["go.MD", "today.md"]);
}

#[test]
#[cfg(unix)]
fn test_symlinked_note_is_ignored() {
    let sandbox = vault();
    let outside = tempfile::TempDir::new().unwrap();
    let secret = outside.path().join("secret.md");
    fs::write(&secret, "do not read").unwrap();
    std::os::unix::fs::symlink(&secret, sandbox.vault.path().join("Journal/link.md")).unwrap();

    let files = Walker::new(sandbox.vault.path(), DiscoveryConfig::default())
        .discover()
        .unwrap();

    assert!(!names(&files).contains(&"link.md".to_string()));
}

#[test]
fn test_missing_vault() {
    let sandbox = Sandbox::new();
    let missing = sandbox.vault.path().join("nope");

    let err = Walker::new(&missing, DiscoveryConfig::default())
        .discover()
        .unwrap_err();

    assert!(matches!(err, ScanError::NotFound(_)));
}

#[test]
fn test_cutoff_is_strictly_after() {
    let sandbox = Sandbox::new();
    let t = now() - Duration::hours(2);
    sandbox.note("before.md", "x", 3 * 3600);
    sandbox.note("exact.md", "x", 2 * 3600);
    sandbox.note("after.md", "x", 3600);

    let files = Walker::new(sandbox.vault.path(), DiscoveryConfig::default())
        .discover()
        .unwrap();
    let kept = filter_since(files, t);

    assert_eq!(names(&kept), vec!["after.md"]);
}
