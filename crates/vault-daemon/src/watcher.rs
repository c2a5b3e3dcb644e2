//! Filesystem watcher feeding the event queue.
//!
//! Raw `notify` events are mapped to vault-relative [`NoteChange`]s.
//! Content modifications are held per path for the external-modify delay
//! before they reach the queue; every other change goes straight in.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vault_indexing::{is_note_path, ChangeKind, FsNoteSource, NoteChange, VaultIndexer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Vault-relative path of `absolute`, unless it sits in a hidden entry.
fn vault_path(source: &FsNoteSource, absolute: &Path) -> Option<String> {
    let relative = source.relative_path(absolute)?;
    (!relative.split('/').any(|part| part.starts_with('.'))).then_some(relative)
}

/// Map one raw watcher event to note changes.
pub fn translate(source: &FsNoteSource, event: &Event) -> Vec<NoteChange> {
    let each = |kind: ChangeKind| -> Vec<NoteChange> {
        event
            .paths
            .iter()
            .filter_map(|path| vault_path(source, path))
            .map(|path| NoteChange::new(kind, path))
            .collect()
    };

    match &event.kind {
        EventKind::Create(_) => each(ChangeKind::Created),
        EventKind::Remove(_) => each(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let from = vault_path(source, &event.paths[0]);
            let to = vault_path(source, &event.paths[1]);
            match (from, to) {
                (Some(from), Some(to)) if is_note_path(&to) => vec![NoteChange::renamed(to, from)],
                (Some(from), _) => vec![NoteChange::new(ChangeKind::Deleted, from)],
                (None, Some(to)) => vec![NoteChange::new(ChangeKind::Created, to)],
                (None, None) => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter_map(|path| {
                let kind = if path.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Deleted
                };
                vault_path(source, path).map(|relative| NoteChange::new(kind, relative))
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => each(ChangeKind::Modified),
        _ => Vec::new(),
    }
}

/// Per-path settle timers for content modifications.
///
/// A new modification of the same path restarts its timer. Only when a
/// timer runs out is a `Modified` change handed to the indexer.
pub struct ModifyDelay {
    indexer: Arc<VaultIndexer>,
    delay: Duration,
    timers: Mutex<HashMap<String, (u64, JoinHandle<()>)>>,
    generation: Mutex<u64>,
}

impl ModifyDelay {
    pub fn new(indexer: Arc<VaultIndexer>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            indexer,
            delay,
            timers: Mutex::new(HashMap::new()),
            generation: Mutex::new(0),
        })
    }

    pub fn schedule(self: &Arc<Self>, path: String) {
        let generation = {
            let mut next = lock(&self.generation);
            *next += 1;
            *next
        };

        let this = Arc::clone(self);
        let task_path = path.clone();
        let mut timers = lock(&self.timers);
        if let Some((_, previous)) = timers.remove(&path) {
            previous.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(this.delay).await;
            {
                let mut timers = lock(&this.timers);
                if timers.get(&task_path).map(|(g, _)| *g) == Some(generation) {
                    timers.remove(&task_path);
                }
            }
            this.indexer
                .handle_change(NoteChange::new(ChangeKind::Modified, task_path));
        });
        timers.insert(path, (generation, handle));
    }

    /// Paths still waiting out their delay.
    pub fn pending(&self) -> usize {
        lock(&self.timers).len()
    }

    pub fn cancel_all(&self) {
        for (_, (_, handle)) in lock(&self.timers).drain() {
            handle.abort();
        }
    }
}

fn create_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        notify::Config::default(),
    )
    .context("Failed to create file watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;
    Ok(watcher)
}

/// Watch the vault until Ctrl+C, then drain and stop the queue.
pub async fn run_watch(indexer: Arc<VaultIndexer>) -> Result<()> {
    let root = std::fs::canonicalize(&indexer.settings().vault_root)
        .context("Vault root does not exist")?;
    let source = FsNoteSource::new(&root);
    let (tx, mut rx) = mpsc::channel(1024);
    let _watcher = create_watcher(&root, tx)?;
    let delay = ModifyDelay::new(
        Arc::clone(&indexer),
        Duration::from_millis(indexer.settings().external_modify_delay_ms),
    );

    info!(root = %root.display(), "Watching vault");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(Ok(event)) => {
                    for change in translate(&source, &event) {
                        debug!(path = %change.path, kind = ?change.kind, "File change");
                        if change.kind == ChangeKind::Modified {
                            delay.schedule(change.path);
                        } else {
                            indexer.handle_change(change);
                        }
                    }
                }
                Some(Err(e)) => warn!(error = %e, "Watcher error"),
                None => break,
            },
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    delay.cancel_all();
    indexer.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use vault_indexing::NoOpNotifier;
    use vault_types::Settings;

    fn source() -> FsNoteSource {
        FsNoteSource::new("/vault")
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_translate_basic_kinds() {
        let created = translate(&source(), &event(EventKind::Create(CreateKind::File), &["/vault/a.md"]));
        assert_eq!(created, vec![NoteChange::new(ChangeKind::Created, "a.md")]);

        let removed = translate(&source(), &event(EventKind::Remove(RemoveKind::File), &["/vault/n/b.md"]));
        assert_eq!(removed, vec![NoteChange::new(ChangeKind::Deleted, "n/b.md")]);

        let modified = translate(
            &source(),
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/vault/a.md"]),
        );
        assert_eq!(modified, vec![NoteChange::new(ChangeKind::Modified, "a.md")]);

        let metadata = translate(
            &source(),
            &event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)), &["/vault/a.md"]),
        );
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_translate_rename_pairs() {
        let rename = EventKind::Modify(ModifyKind::Name(RenameMode::Both));
        let changes = translate(&source(), &event(rename, &["/vault/old.md", "/vault/new.md"]));
        assert_eq!(changes, vec![NoteChange::renamed("new.md", "old.md")]);

        let to_text = translate(&source(), &event(rename, &["/vault/old.md", "/vault/old.txt"]));
        assert_eq!(to_text, vec![NoteChange::new(ChangeKind::Deleted, "old.md")]);

        let from_hidden = translate(&source(), &event(rename, &["/vault/.trash/x.md", "/vault/x.md"]));
        assert_eq!(from_hidden, vec![NoteChange::new(ChangeKind::Created, "x.md")]);
    }

    #[test]
    fn test_translate_skips_hidden_and_outside_paths() {
        let kind = EventKind::Create(CreateKind::File);
        let changes = translate(
            &source(),
            &event(kind, &["/vault/.vault-index/index_state.json", "/elsewhere/a.md"]),
        );
        assert!(changes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_delay_restarts_per_path() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            vault_root: dir.path().to_path_buf(),
            debounce_ms: 60_000,
            ..Settings::default()
        };
        let indexer = Arc::new(VaultIndexer::new(
            settings,
            Arc::new(FsNoteSource::new(dir.path())),
            None,
            Arc::new(NoOpNotifier),
        ));
        let delay = ModifyDelay::new(Arc::clone(&indexer), Duration::from_millis(3_000));

        delay.schedule("a.md".to_string());
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        delay.schedule("a.md".to_string());
        assert_eq!(delay.pending(), 1);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(indexer.queue().stats().queued, 0);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(indexer.queue().stats().queued, 1);
        assert_eq!(delay.pending(), 0);

        indexer.queue().clear();
    }
}
