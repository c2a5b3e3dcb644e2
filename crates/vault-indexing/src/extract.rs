//! Tag and wikilink extraction from note content.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?:^|\s)#([A-Za-z0-9_/-]+)").expect("valid tag pattern"))
}

fn link_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| {
        Regex::new(r"\[\[([^\]|#]+)(?:#[^\]|]+)?(?:\|[^\]]+)?\]\]").expect("valid wikilink pattern")
    })
}

fn dedup_in_order(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

/// Inline `#tags` preceded by start of text or whitespace, in first-seen order.
pub fn extract_tags(content: &str) -> Vec<String> {
    dedup_in_order(
        tag_regex()
            .captures_iter(content)
            .map(|caps| caps[1].to_string()),
    )
}

/// `[[wikilink]]` targets with heading and alias parts removed, in first-seen order.
pub fn extract_outlinks(content: &str) -> Vec<String> {
    dedup_in_order(
        link_regex()
            .captures_iter(content)
            .map(|caps| caps[1].trim().to_string())
            .filter(|target| !target.is_empty()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tags() {
        let content = "#rust intro\nSome text #async/tokio and #rust again.\nemail@x.com#not";
        assert_eq!(extract_tags(content), vec!["rust", "async/tokio"]);
    }

    #[test]
    fn test_tag_stops_at_non_ascii() {
        assert_eq!(extract_tags("#café and #naïve"), vec!["caf", "na"]);
    }

    #[test]
    fn test_heading_is_not_a_tag() {
        assert!(extract_tags("# Heading\n## Sub").is_empty());
    }

    #[test]
    fn test_extract_outlinks() {
        let content = "See [[Project Plan]], [[Notes/Design#Goals]] and [[ Project Plan |the plan]].";
        assert_eq!(extract_outlinks(content), vec!["Project Plan", "Notes/Design"]);
    }

    #[test]
    fn test_no_links() {
        assert!(extract_outlinks("plain [single] brackets").is_empty());
    }
}
