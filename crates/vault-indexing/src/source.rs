//! Narrow adapter over the note store.
//!
//! The pipeline only ever sees [`NoteFile`] values and reads content
//! through a [`NoteSource`]. [`FsNoteSource`] implements it over a vault
//! directory on disk.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::IndexingError;

/// Extension of indexable notes.
pub const NOTE_EXTENSION: &str = "md";

/// A note as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    /// Vault-relative path with `/` separators; also the note id
    pub path: String,
    /// File name without extension
    pub base_name: String,
    pub extension: String,
    pub modified_at: DateTime<Utc>,
}

impl NoteFile {
    pub fn is_markdown(&self) -> bool {
        self.extension == NOTE_EXTENSION
    }

    /// Last path segment, extension included.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Whether a vault-relative path names an indexable note.
pub fn is_note_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext == NOTE_EXTENSION)
}

/// Source of notes for the pipeline.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Every indexable note, sorted by path.
    async fn list_notes(&self) -> Result<Vec<NoteFile>, IndexingError>;

    /// The note at `path`, or `None` if it is missing or not indexable.
    async fn get_note(&self, path: &str) -> Result<Option<NoteFile>, IndexingError>;

    async fn read_content(&self, note: &NoteFile) -> Result<String, IndexingError>;
}

/// Note source backed by a vault directory.
///
/// Hidden directories (such as the index data directory) are skipped.
#[derive(Debug, Clone)]
pub struct FsNoteSource {
    root: PathBuf,
}

impl FsNoteSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a vault-relative path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Vault-relative, `/`-separated form of an absolute path inside the vault.
    pub fn relative_path(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|component| match component {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        let parts = parts?;
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    fn note_from_metadata(path: String, metadata: &std::fs::Metadata) -> NoteFile {
        let as_path = Path::new(&path);
        let base_name = as_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
        let extension = as_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        NoteFile {
            path,
            base_name,
            extension,
            modified_at,
        }
    }

    fn walk(root: &Path) -> Vec<NoteFile> {
        let source = FsNoteSource::new(root);
        let mut notes: Vec<NoteFile> = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == NOTE_EXTENSION))
            .filter_map(|entry| {
                let path = source.relative_path(entry.path())?;
                let metadata = entry.metadata().ok()?;
                Some(Self::note_from_metadata(path, &metadata))
            })
            .collect();
        notes.sort_by(|a, b| a.path.cmp(&b.path));
        notes
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

#[async_trait]
impl NoteSource for FsNoteSource {
    async fn list_notes(&self) -> Result<Vec<NoteFile>, IndexingError> {
        let root = self.root.clone();
        let notes = tokio::task::spawn_blocking(move || Self::walk(&root))
            .await
            .map_err(|e| IndexingError::Source(e.to_string()))?;
        debug!(root = %self.root.display(), count = notes.len(), "Listed notes");
        Ok(notes)
    }

    async fn get_note(&self, path: &str) -> Result<Option<NoteFile>, IndexingError> {
        if !is_note_path(path) {
            return Ok(None);
        }
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(metadata) if metadata.is_file() => {
                Ok(Some(Self::note_from_metadata(path.to_string(), &metadata)))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_content(&self, note: &NoteFile) -> Result<String, IndexingError> {
        Ok(tokio::fs::read_to_string(self.resolve(&note.path)).await?)
    }
}
