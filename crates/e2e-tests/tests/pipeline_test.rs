//! Queue-to-index E2E tests.
//!
//! Drives note changes through the debounced queue and checks the
//! content log and persisted state that come out the other end.

use pretty_assertions::assert_eq;

use e2e_tests::TestHarness;
use vault_indexing::{ChangeKind, NoteChange};
use vault_types::{fingerprint, SummaryStatus};

fn modified(path: &str) -> NoteChange {
    NoteChange::new(ChangeKind::Modified, path)
}

#[tokio::test]
async fn test_burst_of_changes_indexes_once() {
    let harness = TestHarness::new();
    harness.write_note("Notes/plan.md", "Plan for #work with [[Roadmap|the roadmap]]");

    harness
        .apply([
            NoteChange::new(ChangeKind::Created, "Notes/plan.md"),
            modified("Notes/plan.md"),
            modified("Notes/plan.md"),
        ])
        .await;

    let records = harness.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tags, vec!["work"]);
    assert_eq!(records[0].outlinks, vec!["Roadmap"]);
    assert_eq!(records[0].summary_status, SummaryStatus::Pending);

    let stats = harness.indexer.queue().stats();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.dropped_as_duplicate, 2);
    assert_eq!(stats.queued, 0);
}

#[tokio::test]
async fn test_unchanged_content_is_not_reindexed() {
    let harness = TestHarness::new();
    harness.write_note("a.md", "first line\n");
    harness.apply([modified("a.md")]).await;

    harness.write_note("a.md", "first line\r\n");
    harness.apply([modified("a.md")]).await;
    assert_eq!(harness.records().await.len(), 1);

    harness.write_note("a.md", "first line, edited\n");
    harness.apply([modified("a.md")]).await;
    let records = harness.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(
        harness.state().await.hash_of("a.md"),
        Some(fingerprint("first line, edited\n").as_str())
    );
}

#[tokio::test]
async fn test_rename_moves_fingerprint() {
    let harness = TestHarness::new();
    harness.write_note("old.md", "content");
    harness.apply([NoteChange::new(ChangeKind::Created, "old.md")]).await;

    harness.rename_note("old.md", "Moved/new.md");
    harness.apply([NoteChange::renamed("Moved/new.md", "old.md")]).await;

    let state = harness.state().await;
    assert!(state.hash_of("old.md").is_none());
    assert!(state.hash_of("Moved/new.md").is_some());
    let paths: Vec<_> = harness.records().await.into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["old.md", "Moved/new.md"]);
}

#[tokio::test]
async fn test_delete_then_compact() {
    let harness = TestHarness::new();
    harness.write_note("a.md", "v1");
    harness.write_note("b.md", "b");
    harness.apply([modified("a.md"), modified("b.md")]).await;
    harness.write_note("a.md", "v2");
    harness.apply([modified("a.md")]).await;
    harness.write_note("a.md", "v3");
    harness.apply([modified("a.md")]).await;

    harness.remove_note("b.md");
    harness
        .apply([NoteChange::new(ChangeKind::Deleted, "b.md")])
        .await;
    assert!(harness.state().await.hash_of("b.md").is_none());

    let stats = harness.indexer.compact().await.unwrap();
    assert_eq!(stats.lines_before, 4);
    assert_eq!(stats.records_after, 2);

    let records = harness.records().await;
    assert_eq!(records[0].path, "a.md");
    assert_eq!(records[0].hash, fingerprint("v3"));
    assert_eq!(records[1].path, "b.md");
    assert!(harness.messages().contains(&"Index compacted".to_string()));
}

#[tokio::test]
async fn test_exclusions_at_enqueue_and_processing() {
    let harness = TestHarness::build(
        |settings| {
            settings.excluded_folders = vec!["Archive".to_string()];
            settings.excluded_file_patterns = vec!["*.excalidraw.md".to_string()];
            settings.excluded_tags = vec!["private".to_string()];
        },
        None,
    );
    harness.write_note("Archive/old.md", "old");
    harness.write_note("sketch.excalidraw.md", "drawing");
    harness.write_note("diary.md", "dear diary #Private");
    harness.write_note("public.md", "hello #blog");

    let accepted: Vec<bool> = [
        "Archive/old.md",
        "sketch.excalidraw.md",
        "diary.md",
        "public.md",
        "image.png",
    ]
    .into_iter()
    .map(|path| harness.indexer.handle_change(modified(path)))
    .collect();
    assert_eq!(accepted, vec![false, false, true, true, false]);
    harness.indexer.queue().flush_now().await;

    let paths: Vec<_> = harness.records().await.into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["public.md"]);
    let state = harness.state().await;
    assert!(state.hash_of("diary.md").is_none());
    assert_eq!(state.stats.unwrap().total_notes, 1);
}

#[tokio::test]
async fn test_clear_data_resets_index() {
    let harness = TestHarness::new();
    harness.write_note("a.md", "x");
    harness.apply([modified("a.md")]).await;
    assert_eq!(harness.records().await.len(), 1);

    harness.indexer.clear_data().await.unwrap();
    assert!(harness.records().await.is_empty());
    assert!(harness.state().await.last_processed_hash.is_empty());

    harness.apply([modified("a.md")]).await;
    assert_eq!(harness.records().await.len(), 1);
}
