//! Integration tests for settings loading and command wiring.

use std::path::PathBuf;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use vault_daemon::{load_settings, show_status};
use vault_indexing::{MemoryNotifier, VaultIndexer};

fn write_config(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_config_file_and_cli_overrides() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
vault_root = "/from/config"
excluded_tags = "private, draft"
excluded_folders = ["Archive", " "]
max_summary_chars = 240
"#,
    );

    let settings = load_settings(Some(&config), None, None).unwrap();
    assert_eq!(settings.vault_root, PathBuf::from("/from/config"));
    assert_eq!(settings.excluded_tags, vec!["private", "draft"]);
    assert_eq!(settings.excluded_folders, vec!["Archive"]);
    assert_eq!(settings.max_summary_chars, 240);

    let overridden = load_settings(Some(&config), Some("/from/cli"), Some("debug")).unwrap();
    assert_eq!(overridden.vault_root, PathBuf::from("/from/cli"));
    assert_eq!(overridden.log_level, "debug");
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "checkpoint_interval = 0\n");
    assert!(load_settings(Some(&config), None, None).is_err());
}

#[tokio::test]
async fn test_status_on_empty_vault() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");
    let settings = load_settings(Some(&config), dir.path().to_str(), None).unwrap();
    let indexer = VaultIndexer::from_settings(settings, Arc::new(MemoryNotifier::new()));

    show_status(&indexer, true).await.unwrap();
    show_status(&indexer, false).await.unwrap();
    assert!(indexer.paths_text().contains("content_index.jsonl"));
}
