//! Decides which spoken words are worth a visual lookup.
//!
//! Function words, very short words, bare numbers, and tokens carrying
//! punctuation give useless image-search results, so they are filtered out
//! before any dictionary or network lookup happens.

use crate::text_utils::normalize_word;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "is", "it", "its", "and", "or", "but", "of", "to", "in", "on",
        "at", "by", "for", "with", "be", "was", "were", "are", "am", "been", "this",
        "that", "these", "those", "as", "if", "then", "than", "so", "not", "nor", "do",
        "does", "did", "have", "has", "had", "will", "would", "can", "could", "shall",
        "should", "may", "might", "must", "from", "out", "off", "over", "under", "again",
        "there", "here", "when", "where", "why", "how", "all", "any", "both", "each",
        "few", "more", "most", "other", "some", "such", "only", "own", "same", "too",
        "very", "just", "his", "her", "our", "your", "their", "them", "they", "she",
        "him", "who", "whom", "which", "what", "you",
    ]
    .into_iter()
    .collect()
});

static RE_VISUAL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z'-]+$").unwrap());

/// Whether the spoken word should trigger image resolution.
pub fn wants_visual(word: &str) -> bool {
    let normalized = normalize_word(word);
    if normalized.chars().count() <= 2 {
        return false;
    }
    if STOP_WORDS.contains(normalized.as_str()) {
        return false;
    }
    if normalized.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    RE_VISUAL_SHAPE.is_match(&normalized)
}
