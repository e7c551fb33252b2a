//! Text canonicalization for literal phrase comparison.
//!
//! Every comparison in the engine — step detection, phrase rules,
//! verification counting — goes through [`normalize`] on both sides, so
//! matching is case- and punctuation-insensitive but strictly literal.
//! No stemming, no synonymy.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Canonicalize text: lowercase, strip punctuation except apostrophes,
/// collapse whitespace runs to a single space, trim ends.
///
/// Pure and total — never fails, any input yields a canonical string.
pub fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    WHITESPACE_RUN.replace_all(&lowered, " ").trim().to_string()
}

/// Check whether `haystack` contains `phrase`, comparing both in
/// normalized form. Returns false for phrases that normalize to empty.
pub fn contains_phrase(haystack_normalized: &str, phrase: &str) -> bool {
    let needle = normalize(phrase);
    !needle.is_empty() && haystack_normalized.contains(&needle)
}
