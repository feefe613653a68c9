//! Status command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{load_cache, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::provider::ExternalStatus;
use anyhow::Result;

/// Run the status command.
pub async fn run_status(job_id: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Status, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let cache = load_cache(&settings);
    let orchestrator = Orchestrator::new(&settings, cache.clone())?;

    let status = orchestrator.job_status(job_id).await?;

    Output::header(&format!("Job {}", job_id));
    match &status {
        ExternalStatus::Queued => Output::kv("Status", "queued"),
        ExternalStatus::Running { progress } => {
            Output::kv("Status", "running");
            if let Some(progress) = progress {
                Output::kv("Progress", &format!("{}", progress));
            }
        }
        ExternalStatus::Finished { outputs } => {
            Output::kv("Status", "finished");
            for (slot, artifact) in outputs {
                Output::list_item(&format!("{}: {}", slot, artifact.url));
            }
        }
        ExternalStatus::Failed { reason } => {
            Output::kv("Status", "failed");
            Output::kv("Reason", reason);
        }
    }

    if let Some((video_id, record)) = cache.find_by_external_job_id(job_id) {
        Output::kv("Video", &video_id);
        Output::kv("Cached phase", &record.phase.to_string());
    }

    Ok(())
}
