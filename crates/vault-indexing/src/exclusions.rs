//! Path and tag exclusion rules.
//!
//! Folder rules match a path equal to, or nested under, the folder.
//! Pattern rules are `*` wildcards anchored to the whole path. Both are
//! case-insensitive and treat `\` as `/`.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use vault_types::Settings;

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_lowercase()
}

fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .build()
}

/// Compiled exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    folders: Vec<String>,
    patterns: Vec<Regex>,
    tags: HashSet<String>,
}

impl ExclusionRules {
    pub fn new(folders: &[String], patterns: &[String], tags: &[String]) -> Self {
        let folders = folders
            .iter()
            .map(|folder| normalize_path(folder).trim_end_matches('/').to_string())
            .filter(|folder| !folder.is_empty())
            .collect();

        let patterns = patterns
            .iter()
            .filter_map(|pattern| match wildcard_regex(&normalize_path(pattern)) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Ignoring unusable exclusion pattern");
                    None
                }
            })
            .collect();

        let tags = tags.iter().map(|tag| tag.to_lowercase()).collect();

        Self {
            folders,
            patterns,
            tags,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.excluded_folders,
            &settings.excluded_file_patterns,
            &settings.excluded_tags,
        )
    }

    /// Whether a vault-relative path is excluded by a folder or pattern rule.
    pub fn is_path_excluded(&self, path: &str) -> bool {
        let normalized = normalize_path(path);
        let folder_hit = self.folders.iter().any(|folder| {
            normalized == *folder
                || normalized
                    .strip_prefix(folder.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        folder_hit || self.patterns.iter().any(|re| re.is_match(&normalized))
    }

    /// Whether any tag is in the excluded set, ignoring case.
    pub fn has_excluded_tag(&self, tags: &[String]) -> bool {
        tags.iter()
            .any(|tag| self.tags.contains(&tag.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(folders: &[&str], patterns: &[&str]) -> ExclusionRules {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        ExclusionRules::new(&owned(folders), &owned(patterns), &[])
    }

    #[test]
    fn test_folder_and_pattern_rules() {
        let rules = rules(&["Daily Notes"], &["*.canvas"]);
        assert!(rules.is_path_excluded("Daily Notes/2026-02-10.md"));
        assert!(rules.is_path_excluded("Projects/test.canvas"));
        assert!(!rules.is_path_excluded("Notes/article.md"));
    }

    #[test]
    fn test_folder_rule_requires_segment_boundary() {
        let rules = rules(&["Daily/"], &[]);
        assert!(rules.is_path_excluded("Daily"));
        assert!(rules.is_path_excluded("daily/today.md"));
        assert!(!rules.is_path_excluded("Daily Notes/today.md"));
    }

    #[test]
    fn test_paths_are_normalized() {
        let rules = rules(&["Archive"], &["templates/*"]);
        assert!(rules.is_path_excluded("./archive\\old.md"));
        assert!(rules.is_path_excluded("Templates/Meeting.md"));
    }

    #[test]
    fn test_pattern_is_anchored_and_escaped() {
        let rules = rules(&[], &["draft.md", "a+b*"]);
        assert!(rules.is_path_excluded("DRAFT.md"));
        assert!(!rules.is_path_excluded("Notes/draft.md"));
        assert!(!rules.is_path_excluded("draftxmd"));
        assert!(rules.is_path_excluded("a+b/notes.md"));
        assert!(!rules.is_path_excluded("aab"));
    }

    #[test]
    fn test_excluded_tags_ignore_case() {
        let rules = ExclusionRules::new(&[], &[], &["Private".to_string()]);
        assert!(rules.has_excluded_tag(&["work".to_string(), "private".to_string()]));
        assert!(!rules.has_excluded_tag(&["work".to_string()]));
    }
}
