//! Content normalization and fingerprinting.
//!
//! A fingerprint is the lowercase hex SHA-256 of the normalized note text.
//! Two texts that differ only in line-ending style or surrounding
//! whitespace share a fingerprint.

use sha2::{Digest, Sha256};

/// Collapse CRLF line endings to LF and trim surrounding whitespace,
/// including a byte-order mark.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_string()
}

/// Compute the fingerprint of `text` after normalization.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    format!("{:x}", hasher.finalize())
}
