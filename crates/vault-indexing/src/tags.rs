//! Tag index built from the content log.
//!
//! Every record contributes its path to each of its tags. Stale records
//! count too until the log is compacted.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use vault_storage::IndexLog;
use vault_types::IndexRecord;

use crate::error::IndexingError;

/// Files listed per tag in the JSON export.
pub const JSON_FILES_PER_TAG: usize = 10;

/// Tag to note paths, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    entries: Vec<(String, Vec<String>)>,
}

#[derive(Serialize)]
struct TagSummary<'a> {
    count: usize,
    files: &'a [String],
}

impl TagIndex {
    pub fn from_records(records: &[IndexRecord]) -> Self {
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();

        for record in records {
            for tag in &record.tags {
                let slot = *slots.entry(tag.as_str()).or_insert_with(|| {
                    entries.push((tag.clone(), Vec::new()));
                    entries.len() - 1
                });
                let paths = &mut entries[slot].1;
                if !paths.contains(&record.path) {
                    paths.push(record.path.clone());
                }
            }
        }
        Self { entries }
    }

    pub async fn load(log: &IndexLog) -> Result<Self, IndexingError> {
        Ok(Self::from_records(&log.read_records().await?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths for `tag`, if present.
    pub fn files(&self, tag: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, paths)| paths.as_slice())
    }

    fn sorted(&self) -> Vec<&(String, Vec<String>)> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
    }

    /// Markdown listing sorted by tag, each file as a wikilink.
    pub fn to_markdown(&self, generated_at: DateTime<Utc>) -> String {
        let mut out = String::from("# Tags Index\n\n");
        out.push_str(&format!(
            "Generated: {}\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!("Total tags: {}\n\n", self.len()));
        out.push_str("---\n\n");

        for (tag, paths) in self.sorted() {
            out.push_str(&format!("## #{tag}\n\n"));
            out.push_str(&format!("**Count**: {} file(s)\n\n", paths.len()));
            for path in paths {
                let file_name = path.rsplit('/').next().unwrap_or(path);
                out.push_str(&format!("- [[{path}|{file_name}]]\n"));
            }
            out.push('\n');
        }
        out
    }

    /// `{tag: {count, files}}` with at most [`JSON_FILES_PER_TAG`] files each.
    pub fn to_json(&self) -> Result<String, IndexingError> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(tag, paths)| {
                let summary = TagSummary {
                    count: paths.len(),
                    files: &paths[..paths.len().min(JSON_FILES_PER_TAG)],
                };
                serde_json::to_value(summary).map(|value| (tag.clone(), value))
            })
            .collect::<Result<_, _>>()?;
        Ok(serde_json::to_string_pretty(&map)?)
    }
}

async fn write_file(target: &Path, contents: String) -> Result<(), IndexingError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, contents).await?;
    Ok(())
}

/// Write the Markdown tag listing to `target`. Returns the tag count, or
/// `None` when the log has no tags (nothing is written).
pub async fn export_tags_markdown(
    log: &IndexLog,
    target: &Path,
) -> Result<Option<usize>, IndexingError> {
    let index = TagIndex::load(log).await?;
    if index.is_empty() {
        return Ok(None);
    }
    write_file(target, index.to_markdown(Utc::now())).await?;
    info!(path = %target.display(), tags = index.len(), "Exported tags");
    Ok(Some(index.len()))
}

/// Write the JSON tag summary to `target`. Same contract as
/// [`export_tags_markdown`].
pub async fn export_tags_json(
    log: &IndexLog,
    target: &Path,
) -> Result<Option<usize>, IndexingError> {
    let index = TagIndex::load(log).await?;
    if index.is_empty() {
        return Ok(None);
    }
    write_file(target, index.to_json()?).await?;
    info!(path = %target.display(), tags = index.len(), "Exported tags JSON");
    Ok(Some(index.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use vault_types::{SummaryStatus, INDEX_SCHEMA_VERSION};

    fn record(path: &str, tags: &[&str]) -> IndexRecord {
        IndexRecord {
            schema_version: INDEX_SCHEMA_VERSION.to_string(),
            note_id: path.to_string(),
            path: path.to_string(),
            title: path.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            outlinks: Vec::new(),
            summary: None,
            summary_status: SummaryStatus::Pending,
            hash: "h".to_string(),
            mtime: Utc::now(),
            provider_meta: None,
        }
    }

    #[test]
    fn test_from_records_dedupes_paths() {
        let index = TagIndex::from_records(&[
            record("Notes/a.md", &["rust", "async"]),
            record("b.md", &["rust"]),
            record("Notes/a.md", &["rust"]),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.files("rust").unwrap(),
            &["Notes/a.md".to_string(), "b.md".to_string()]
        );
        assert_eq!(index.files("async").unwrap(), &["Notes/a.md".to_string()]);
        assert!(index.files("missing").is_none());
    }

    #[test]
    fn test_markdown_is_sorted_by_tag() {
        let index = TagIndex::from_records(&[
            record("Notes/a.md", &["zeta"]),
            record("b.md", &["alpha"]),
        ]);
        let generated = DateTime::parse_from_rfc3339("2026-02-10T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let markdown = index.to_markdown(generated);

        let expected = "# Tags Index\n\n\
            Generated: 2026-02-10 08:30:00 UTC\n\n\
            Total tags: 2\n\n\
            ---\n\n\
            ## #alpha\n\n\
            **Count**: 1 file(s)\n\n\
            - [[b.md|b.md]]\n\n\
            ## #zeta\n\n\
            **Count**: 1 file(s)\n\n\
            - [[Notes/a.md|a.md]]\n\n";
        assert_eq!(markdown, expected);
    }

    #[test]
    fn test_json_limits_files() {
        let records: Vec<_> = (0..12)
            .map(|i| record(&format!("n{i:02}.md"), &["bulk"]))
            .collect();
        let json: serde_json::Value =
            serde_json::from_str(&TagIndex::from_records(&records).to_json().unwrap()).unwrap();
        assert_eq!(json["bulk"]["count"], 12);
        assert_eq!(json["bulk"]["files"].as_array().unwrap().len(), JSON_FILES_PER_TAG);
        assert_eq!(json["bulk"]["files"][0], "n00.md");
    }

    #[tokio::test]
    async fn test_export_skips_empty_index() {
        let dir = TempDir::new().unwrap();
        let log = IndexLog::new(dir.path().join("content_index.jsonl"));
        log.append(&record("a.md", &[])).await.unwrap();

        let target = dir.path().join("Tags.md");
        assert_eq!(export_tags_markdown(&log, &target).await.unwrap(), None);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_export_writes_files() {
        let dir = TempDir::new().unwrap();
        let log = IndexLog::new(dir.path().join("data").join("content_index.jsonl"));
        log.append(&record("a.md", &["x", "y"])).await.unwrap();

        let md = dir.path().join("Tags.md");
        let json = dir.path().join("data").join("tags_index.json");
        assert_eq!(export_tags_markdown(&log, &md).await.unwrap(), Some(2));
        assert_eq!(export_tags_json(&log, &json).await.unwrap(), Some(2));
        assert!(std::fs::read_to_string(md).unwrap().contains("## #x"));
        assert!(std::fs::read_to_string(json).unwrap().contains("\"y\""));
    }
}
