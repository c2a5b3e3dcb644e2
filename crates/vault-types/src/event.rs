//! Change notifications flowing into the event queue.

use serde::{Deserialize, Serialize};

/// Kind of change observed for a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexEventType {
    Create,
    Modify,
    Rename,
    Delete,
}

impl std::fmt::Display for IndexEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexEventType::Create => write!(f, "create"),
            IndexEventType::Modify => write!(f, "modify"),
            IndexEventType::Rename => write!(f, "rename"),
            IndexEventType::Delete => write!(f, "delete"),
        }
    }
}

/// An ephemeral change event for one note.
///
/// The note id is the vault-relative path. Events for the same note id
/// coalesce in the queue; only the latest survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEvent {
    pub event_type: IndexEventType,
    pub note_id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    /// Milliseconds since epoch, used to order a drained batch.
    pub timestamp_ms: i64,
}

impl IndexEvent {
    /// Create an event whose note id is its path.
    pub fn new(event_type: IndexEventType, path: impl Into<String>, timestamp_ms: i64) -> Self {
        let path = path.into();
        Self {
            event_type,
            note_id: path.clone(),
            path,
            old_path: None,
            timestamp_ms,
        }
    }

    /// Create a rename event from `old_path` to `path`.
    pub fn renamed(path: impl Into<String>, old_path: impl Into<String>, timestamp_ms: i64) -> Self {
        let mut event = Self::new(IndexEventType::Rename, path, timestamp_ms);
        event.old_path = Some(old_path.into());
        event
    }

    /// Create an event stamped with the current time.
    pub fn now(event_type: IndexEventType, path: impl Into<String>) -> Self {
        Self::new(event_type, path, chrono::Utc::now().timestamp_millis())
    }

    pub fn is_rename(&self) -> bool {
        self.event_type == IndexEventType::Rename
    }

    /// Short `type:note_id` label used in logs.
    pub fn label(&self) -> String {
        format!("{}:{}", self.event_type, self.note_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_path_as_note_id() {
        let event = IndexEvent::new(IndexEventType::Modify, "Notes/a.md", 5);
        assert_eq!(event.note_id, "Notes/a.md");
        assert_eq!(event.path, "Notes/a.md");
        assert!(event.old_path.is_none());
        assert_eq!(event.label(), "modify:Notes/a.md");
    }

    #[test]
    fn test_renamed_carries_old_path() {
        let event = IndexEvent::renamed("b.md", "a.md", 1);
        assert!(event.is_rename());
        assert_eq!(event.old_path.as_deref(), Some("a.md"));
    }

    #[test]
    fn test_event_type_serialization() {
        let json = serde_json::to_string(&IndexEventType::Delete).unwrap();
        assert_eq!(json, "\"delete\"");
    }
}
