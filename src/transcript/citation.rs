//! Timestamp citations in model answers.
//!
//! Answers are returned verbatim; this module only locates `[MM:SS]` and
//! `[HH:MM:SS]` citations so a presentation layer can turn them into links.

use crate::video::watch_url_at;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2}):(\d{2})(?::(\d{2}))?\]").expect("Invalid regex")
});

/// A bracketed timestamp found in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    /// The literal citation, brackets included.
    pub label: String,
    /// Offset into the video in seconds.
    pub seconds: u64,
    /// Watch URL seeking to the offset.
    pub url: String,
}

/// Parse a single bracketed citation into seconds.
pub fn citation_seconds(label: &str) -> Option<u64> {
    let caps = CITATION_RE.captures(label.trim())?;
    let first: u64 = caps.get(1)?.as_str().parse().ok()?;
    let second: u64 = caps.get(2)?.as_str().parse().ok()?;

    match caps.get(3) {
        Some(third) => {
            let third: u64 = third.as_str().parse().ok()?;
            Some(first * 3600 + second * 60 + third)
        }
        None => Some(first * 60 + second),
    }
}

/// Find every citation in `text`, in order of appearance, de-duplicated.
pub fn extract_citations(text: &str, video_id: &str) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();

    for m in CITATION_RE.find_iter(text) {
        let label = m.as_str();
        if citations.iter().any(|c| c.label == label) {
            continue;
        }
        if let Some(seconds) = citation_seconds(label) {
            citations.push(Citation {
                label: label.to_string(),
                seconds,
                url: watch_url_at(video_id, seconds),
            });
        }
    }

    citations
}
