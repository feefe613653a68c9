//! Process command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{load_cache, save_cache, Output};
use crate::config::Settings;
use crate::job::{JobPhase, JobRecord};
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the process command.
pub async fn run_process(video: &str, json: bool, show_transcript: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Process, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'sievetube doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let record = fetch_transcript(video, &settings).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    match record.phase {
        JobPhase::Ready => {
            Output::success(&format!("Transcript ready for {}", record.video_id));
            Output::job_record(&record);
            if show_transcript {
                if let Some(transcript) = record.ready_transcript() {
                    println!("\n{}", transcript.format_with_timestamps());
                }
            }
        }
        _ => {
            Output::error(record.user_message().unwrap_or("Video is still processing."));
            Output::job_record(&record);
        }
    }

    Ok(())
}

/// Run one orchestration cycle with a spinner, persisting the cache afterwards.
pub(crate) async fn fetch_transcript(video: &str, settings: &Settings) -> Result<JobRecord> {
    let cache = load_cache(settings);
    let orchestrator = Orchestrator::new(settings, cache.clone())?;

    let spinner = Output::spinner("Fetching subtitles...");
    let result = orchestrator.submit_or_fetch(video).await;
    spinner.finish_and_clear();

    if let Err(e) = save_cache(settings, &cache) {
        Output::warning(&format!("Failed to save job cache: {}", e));
    }

    Ok(result?)
}
