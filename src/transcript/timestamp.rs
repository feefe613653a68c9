//! Canonical timestamp formatting.
//!
//! Transcript lines and model citations use a bracketed clock: `[MM:SS]` for
//! offsets under one hour and `[HH:MM:SS]` otherwise, always zero-padded.
//! Link generation downstream matches this exact shape.

/// Parse a cue time such as `00:08:38.959`, `08:38.959` or `00:08:38,959` into seconds.
pub fn parse_timestamp(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let parts: Vec<&str> = input.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (parse_field(h)?, parse_field(m)?, parse_seconds(s)?),
        [m, s] => (0, parse_field(m)?, parse_seconds(s)?),
        _ => return None,
    };

    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Some(whole as f64 + seconds)
}

fn parse_field(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_seconds(field: &str) -> Option<f64> {
    let normalized = field.replace(',', ".");
    let (whole, fraction) = match normalized.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (normalized.as_str(), None),
    };

    parse_field(whole)?;
    if let Some(f) = fraction {
        if !f.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    normalized.parse().ok()
}

/// Round an offset to whole seconds. Negative and non-finite values clamp to zero.
pub fn round_seconds(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    seconds.round() as u64
}

/// Format seconds as `MM:SS` or `HH:MM:SS` (no brackets).
pub fn format_clock(seconds: f64) -> String {
    let total = round_seconds(seconds);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format seconds in the bracketed citation form, e.g. `[08:39]` or `[01:08:39]`.
pub fn format_timestamp(seconds: f64) -> String {
    format!("[{}]", format_clock(seconds))
}

/// Format a raw cue start time (e.g. `00:00:59.600`) in bracketed form.
pub fn format_cue_timestamp(input: &str) -> Option<String> {
    parse_timestamp(input).map(format_timestamp)
}
