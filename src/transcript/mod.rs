//! Transcript data model.
//!
//! A transcript is the ordered list of timed segments materialized from a
//! subtitle track. Segments are immutable once built.

pub mod citation;
pub mod timestamp;

pub use citation::{extract_citations, Citation};
pub use timestamp::{format_clock, format_cue_timestamp, format_timestamp, parse_timestamp};

use serde::{Deserialize, Serialize};

/// A single timed line of spoken content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    start_offset_seconds: u64,
    text: String,
}

impl TranscriptSegment {
    /// Create a new segment.
    pub fn new(start_offset_seconds: u64, text: impl Into<String>) -> Self {
        Self {
            start_offset_seconds,
            text: text.into(),
        }
    }

    /// Start offset into the media, in whole seconds.
    pub fn start_offset_seconds(&self) -> u64 {
        self.start_offset_seconds
    }

    /// Spoken text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bracketed start timestamp, e.g. `[02:05]`.
    pub fn timestamp(&self) -> String {
        format_timestamp(self.start_offset_seconds as f64)
    }
}

/// An ordered sequence of transcript segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Create a transcript from segments in chronological order.
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Offset of the last segment, in seconds.
    pub fn last_offset_seconds(&self) -> u64 {
        self.segments
            .last()
            .map(|s| s.start_offset_seconds)
            .unwrap_or(0)
    }

    /// Render as one `[MM:SS] text` line per segment, the form injected into chat prompts.
    pub fn format_with_timestamps(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("{} {}", s.timestamp(), s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<TranscriptSegment>> for Transcript {
    fn from(segments: Vec<TranscriptSegment>) -> Self {
        Self::new(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_with_timestamps() {
        let transcript = Transcript::new(vec![
            TranscriptSegment::new(1, "Hello world"),
            TranscriptSegment::new(125, "Second line"),
            TranscriptSegment::new(3725, "Much later"),
        ]);

        assert_eq!(
            transcript.format_with_timestamps(),
            "[00:01] Hello world\n[02:05] Second line\n[01:02:05] Much later"
        );
        assert_eq!(transcript.last_offset_seconds(), 3725);
    }

    #[test]
    fn test_segment_serializes_camel_case() {
        let segment = TranscriptSegment::new(7, "hi");
        let json = serde_json::to_string(&segment).unwrap();
        assert_eq!(json, r#"{"startOffsetSeconds":7,"text":"hi"}"#);

        let transcript = Transcript::new(vec![segment]);
        let json = serde_json::to_string(&transcript).unwrap();
        assert!(json.starts_with('['));
    }
}
