//! WebVTT subtitle parsing.
//!
//! Produces one [`TranscriptSegment`] per cue, keyed by the cue's start time.
//! Parsing is lenient per cue: a cue with an unreadable time range or no text
//! is skipped and the rest of the track still parses.

use crate::transcript::timestamp::{parse_timestamp, round_seconds};
use crate::transcript::TranscriptSegment;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CUE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

/// A cue being accumulated.
struct OpenCue {
    start: Option<f64>,
    lines: Vec<String>,
}

impl OpenCue {
    fn finish(self, segments: &mut Vec<TranscriptSegment>, skipped: &mut usize) {
        let Some(start) = self.start else {
            *skipped += 1;
            return;
        };
        if self.lines.is_empty() {
            *skipped += 1;
            return;
        }
        segments.push(TranscriptSegment::new(
            round_seconds(start),
            self.lines.join(" "),
        ));
    }
}

/// Parse WebVTT text into ordered transcript segments.
pub fn parse_vtt(input: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut skipped = 0usize;
    let mut current: Option<OpenCue> = None;

    let mut lines = input.lines().map(|l| l.trim_start_matches('\u{feff}').trim());

    // Header block: the WEBVTT line plus any metadata up to the first blank line.
    let mut pending_first: Option<&str> = None;
    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        if line.starts_with("WEBVTT") {
            while let Some(header) = lines.next() {
                if header.is_empty() {
                    break;
                }
                if header.contains("-->") {
                    pending_first = Some(header);
                    break;
                }
            }
        } else {
            pending_first = Some(line);
        }
        break;
    }

    for line in pending_first.into_iter().chain(lines) {
        if line.contains("-->") {
            if let Some(cue) = current.take() {
                cue.finish(&mut segments, &mut skipped);
            }
            let start = line.split("-->").next().and_then(parse_timestamp);
            current = Some(OpenCue {
                start,
                lines: Vec::new(),
            });
        } else if line.is_empty() {
            if let Some(cue) = current.take() {
                cue.finish(&mut segments, &mut skipped);
            }
        } else if let Some(cue) = current.as_mut() {
            let text = clean_text(line);
            if !text.is_empty() {
                cue.lines.push(text);
            }
        }
        // Lines outside a cue are identifiers or NOTE/STYLE/REGION blocks.
    }

    // The last cue has no trailing blank line to close it.
    if let Some(cue) = current.take() {
        cue.finish(&mut segments, &mut skipped);
    }

    debug!("Parsed {} cues ({} skipped)", segments.len(), skipped);
    segments
}

/// Strip inline cue tags and collapse whitespace.
fn clean_text(line: &str) -> String {
    let stripped = CUE_TAG_RE.replace_all(line, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segments: &[TranscriptSegment]) -> Vec<(u64, &str)> {
        segments
            .iter()
            .map(|s| (s.start_offset_seconds(), s.text()))
            .collect()
    }

    #[test]
    fn test_single_cue() {
        let segments = parse_vtt("WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nHello world\n");
        assert_eq!(texts(&segments), vec![(1, "Hello world")]);
    }

    #[test]
    fn test_final_cue_without_trailing_blank_line() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nFirst\n\n00:00:04.000 --> 00:00:05.000\nLast";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(1, "First"), (4, "Last")]);
    }

    #[test]
    fn test_header_metadata_and_identifiers_skipped() {
        let input = "WEBVTT Kind: captions\nLanguage: en\n\n\
                     1\n00:00:01.000 --> 00:00:02.000 align:start position:0%\nOne\n\n\
                     intro-cue\n00:01:10.600 --> 00:01:12.000\nTwo\n";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(1, "One"), (71, "Two")]);
    }

    #[test]
    fn test_multiline_cue_joined_with_space() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\n  Hello \nthere\nworld\n";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(1, "Hello there world")]);
    }

    #[test]
    fn test_empty_cue_dropped() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n\n00:00:03.000 --> 00:00:04.000\nKept\n";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(3, "Kept")]);
    }

    #[test]
    fn test_malformed_cue_skipped() {
        let input = "WEBVTT\n\nxx:yy --> 00:00:02.000\nBroken\n\n00:00:03.000 --> 00:00:04.000\nFine\n";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(3, "Fine")]);
    }

    #[test]
    fn test_overflowing_cue_time_skipped() {
        let input = "WEBVTT\n\n9999999999999999:00:00.000 --> 00:00:02.000\nBad\n\n00:00:03.000 --> 00:00:04.000\nFine\n";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(3, "Fine")]);
    }

    #[test]
    fn test_cues_without_blank_separator() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nA\n00:00:02.000 --> 00:00:03.000\nB\n";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(1, "A"), (2, "B")]);
    }

    #[test]
    fn test_note_blocks_and_inline_tags() {
        let input = "WEBVTT\r\n\r\nNOTE this is a comment\r\nspanning lines\r\n\r\n\
                     00:00:05.200 --> 00:00:06.000\r\n<00:00:05.200><c> tagged</c><c> words</c>\r\n";
        let segments = parse_vtt(input);
        assert_eq!(texts(&segments), vec![(5, "tagged words")]);
    }

    #[test]
    fn test_rounds_start_time() {
        let segments = parse_vtt("WEBVTT\n\n00:00:59.600 --> 00:01:01.000\nRounded\n");
        assert_eq!(segments[0].start_offset_seconds(), 60);
    }

    #[test]
    fn test_missing_header_still_parses() {
        let segments = parse_vtt("00:00:01.000 --> 00:00:02.000\nNo header\n");
        assert_eq!(texts(&segments), vec![(1, "No header")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_vtt("").is_empty());
        assert!(parse_vtt("WEBVTT\n").is_empty());
    }
}
