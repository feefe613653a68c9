//! CLI output formatting utilities.

use crate::job::{JobPhase, JobRecord};
use crate::transcript::Citation;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a summary of a job record.
    pub fn job_record(record: &JobRecord) {
        let phase = match record.phase {
            JobPhase::Ready => style(record.phase.to_string()).green(),
            JobPhase::Failed => style(record.phase.to_string()).red(),
            _ => style(record.phase.to_string()).yellow(),
        };

        println!("  {} {} ({})", style("*").cyan(), style(&record.video_id).bold(), phase);
        if let Some(job_id) = &record.external_job_id {
            Self::kv("Job", job_id);
        }
        Self::kv("Created", &record.created_at.to_rfc3339());
        Self::kv("Last checked", &record.last_checked_at.to_rfc3339());
        if let Some(transcript) = &record.transcript {
            Self::kv(
                "Transcript",
                &format!(
                    "{} segments, {}",
                    transcript.len(),
                    format_duration(transcript.last_offset_seconds())
                ),
            );
        }
        if let Some(error) = &record.error {
            Self::kv("Error", &error.to_string());
        }
    }

    /// Print a citation with its deep link.
    pub fn citation(citation: &Citation) {
        println!(
            "  {} {}",
            style(&citation.label).cyan(),
            style(&citation.url).dim()
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed}] {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(212), "3m 32s");
        assert_eq!(format_duration(3723), "1h 2m 3s");
    }
}
