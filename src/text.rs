//! Phrase canonicalization helpers.
//!
//! Two forms are used: a display form that only tidies whitespace (labels and
//! phrases are stored this way) and a matching form used to build classifier
//! features.

use regex::Regex;
use std::sync::OnceLock;

fn whitespace_run() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex must compile"))
}

/// Trim and collapse internal whitespace runs to a single space.
pub fn canonical_phrase(input: &str) -> String {
    whitespace_run().replace_all(input.trim(), " ").into_owned()
}

/// Lowercase and replace separators/punctuation with spaces for feature matching.
pub fn normalize_for_matching(input: &str) -> String {
    let mapped: String = input
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch.is_whitespace() {
                ch
            } else {
                ' '
            }
        })
        .collect::<String>()
        .to_lowercase();
    canonical_phrase(&mapped)
}
