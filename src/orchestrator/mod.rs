//! Subtitle job orchestrator.
//!
//! Drives one external subtitle job per video through
//! `Pending -> Submitted -> Polling* -> Ready | Failed`, collapsing concurrent
//! requests for the same video into a single in-flight cycle.
//!
//! All record mutations go through [`JobCache::update`] and are guarded by the
//! phase transition table and the record's external job ID, so a poll result
//! and an asynchronous provider event can interleave without lost updates.

mod clock;
mod policy;
pub mod single_flight;

pub use clock::{Clock, SystemClock};
pub use policy::PollPolicy;
pub use single_flight::SingleFlight;

use crate::cache::JobCache;
use crate::config::Settings;
use crate::error::{Result, SievetubeError};
use crate::openai::create_http_client;
use crate::job::{JobError, JobPhase, JobRecord};
use crate::provider::{
    ArtifactKind, ExternalStatus, JobClient, JobEvent, JobRequest, Outputs, SieveClient,
};
use crate::subtitle::parse_vtt;
use crate::transcript::Transcript;
use crate::video::{extract_video_id, watch_url};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll: PollPolicy,
    /// Age after which a record is discarded and resubmitted.
    pub ttl: chrono::Duration,
    /// Output slot holding the subtitle track (a language code).
    pub subtitle_language: String,
    pub metadata_fields: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            ttl: chrono::Duration::seconds(3600),
            subtitle_language: "en".to_string(),
            metadata_fields: vec![
                "title".to_string(),
                "description".to_string(),
                "duration".to_string(),
            ],
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll: PollPolicy::from(&settings.polling),
            ttl: settings.cache.ttl(),
            subtitle_language: settings.sieve.subtitle_language.clone(),
            metadata_fields: settings.sieve.metadata_fields.clone(),
        }
    }
}

/// Acknowledgement returned for an asynchronous job event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EventAck {
    /// The event matched a cached job.
    #[serde(rename = "ok")]
    Applied {
        #[serde(rename = "videoId")]
        video_id: String,
        phase: JobPhase,
    },
    /// No cached job has this external ID.
    Ignored,
}

/// Coordinates submission, deduplication, polling and transcript materialization.
#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<dyn JobClient>,
    cache: Arc<JobCache>,
    clock: Arc<dyn Clock>,
    config: Arc<OrchestratorConfig>,
    flights: SingleFlight<String, JobRecord>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the Sieve API.
    pub fn new(settings: &Settings, cache: Arc<JobCache>) -> Result<Self> {
        let api_key = settings.sieve_api_key().ok_or_else(|| {
            SievetubeError::Config(
                "Sieve API key not configured. Set SIEVE_API_KEY or sieve.api_key.".to_string(),
            )
        })?;

        let http = create_http_client(settings.general.request_timeout())?;
        let client = SieveClient::new(
            http,
            settings.sieve.api_url.clone(),
            api_key,
            settings.sieve.function.clone(),
        );

        Ok(Self::with_components(
            Arc::new(client),
            cache,
            Arc::new(SystemClock),
            OrchestratorConfig::from_settings(settings),
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        client: Arc<dyn JobClient>,
        cache: Arc<JobCache>,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            client,
            cache,
            clock,
            config: Arc::new(config),
            flights: SingleFlight::new(),
        }
    }

    /// The shared job cache.
    pub fn cache(&self) -> Arc<JobCache> {
        Arc::clone(&self.cache)
    }

    /// Whether an orchestration cycle is currently running for a video.
    pub fn is_in_flight(&self, video_id: &str) -> bool {
        self.flights.is_in_flight(&video_id.to_string())
    }

    /// Return the cached transcript for a video, or submit and wait for one.
    ///
    /// Accepts a bare video ID or any YouTube URL form. The returned record is
    /// terminal (`Ready` or `Failed`); failures are reported inside the record.
    #[instrument(skip(self))]
    pub async fn submit_or_fetch(&self, input: &str) -> Result<JobRecord> {
        let video_id = extract_video_id(input).ok_or_else(|| {
            SievetubeError::InvalidRequest(format!("Not a YouTube video ID or URL: {}", input))
        })?;

        if let Some(record) = self.reusable_record(&video_id) {
            debug!("Using cached {} job for {}", record.phase, video_id);
            return Ok(record);
        }

        let cycle = self.clone().run_cycle(video_id.clone());
        let (flight, joined) = self.flights.run(video_id.clone(), cycle);
        if joined {
            info!("Request already in progress for {}", video_id);
        }

        flight
            .await
            .map_err(|e| SievetubeError::Task(format!("Orchestration for {} failed: {}", video_id, e)))
    }

    /// The transcript for a video, if its job is `Ready` and unexpired.
    pub fn transcript(&self, video_id: &str) -> Result<Transcript> {
        let now = self.clock.now();
        self.cache
            .get(video_id)
            .filter(|r| !r.is_expired(now, self.config.ttl))
            .and_then(|r| r.ready_transcript().cloned())
            .ok_or_else(|| SievetubeError::TranscriptNotReady(video_id.to_string()))
    }

    /// Check a provider job once, without touching the cache.
    pub async fn job_status(&self, external_job_id: &str) -> Result<ExternalStatus> {
        Ok(self.client.poll_once(external_job_id).await?)
    }

    /// Apply an asynchronous provider notification.
    ///
    /// The event is matched to a video by scanning the cache for its job ID.
    /// Unknown jobs are logged and ignored.
    #[instrument(skip(self, event), fields(job_id = %event.id))]
    pub async fn handle_event(&self, event: JobEvent) -> EventAck {
        let Some((video_id, record)) = self.cache.find_by_external_job_id(&event.id) else {
            warn!("Received job event for unknown job {}", event.id);
            return EventAck::Ignored;
        };

        let updated = match event.external_status() {
            Some(status) => self.apply_status(&video_id, &event.id, status).await,
            None => {
                let now = self.clock.now();
                self.cache.update(&video_id, |r| {
                    if r.external_job_id.as_deref() == Some(event.id.as_str()) {
                        r.last_checked_at = now;
                    }
                })
            }
        };

        let phase = updated.map(|r| r.phase).unwrap_or(record.phase);
        info!("Applied job event for {} ({})", video_id, phase);
        EventAck::Applied { video_id, phase }
    }

    /// A cached record that can be returned without starting a cycle.
    ///
    /// Expired records and retryable failures are evicted here.
    fn reusable_record(&self, video_id: &str) -> Option<JobRecord> {
        let record = self.cache.get(video_id)?;

        if record.is_expired(self.clock.now(), self.config.ttl) {
            info!("Cached job for {} expired, discarding", video_id);
            self.cache.delete(video_id);
            return None;
        }

        match record.phase {
            JobPhase::Ready => Some(record),
            JobPhase::Failed => match &record.error {
                Some(error) if !error.is_retryable() => Some(record),
                _ => {
                    info!("Clearing failed job for {} so it can be retried", video_id);
                    self.cache.delete(video_id);
                    None
                }
            },
            _ => None,
        }
    }

    /// One orchestration cycle. Always ends with a terminal record.
    async fn run_cycle(self, video_id: String) -> JobRecord {
        // A previous flight may have settled the record after the caller checked.
        if let Some(record) = self.reusable_record(&video_id) {
            debug!("Job for {} settled before the cycle started", video_id);
            return record;
        }

        let now = self.clock.now();
        let resumable = self
            .cache
            .get(&video_id)
            .filter(|r| !r.phase.is_terminal() && !r.is_expired(now, self.config.ttl))
            .and_then(|r| r.external_job_id.clone().map(|id| (id, r)));

        let (external_job_id, record) = match resumable {
            Some((id, record)) => {
                info!("Resuming job {} for {}", id, video_id);
                (id, record)
            }
            None => match self.submit(&video_id).await {
                Ok(submitted) => submitted,
                Err(failed) => return failed,
            },
        };

        self.poll_until_terminal(&video_id, &external_job_id, record)
            .await
    }

    /// `Pending -> Submitted`, or `Pending -> Failed` when the provider rejects the job.
    async fn submit(&self, video_id: &str) -> std::result::Result<(String, JobRecord), JobRecord> {
        let pending = JobRecord::pending(video_id, self.clock.now());
        self.cache.put(video_id, pending.clone());

        let request = JobRequest {
            source_url: watch_url(video_id),
            artifact: ArtifactKind::Subtitles,
            metadata_fields: self.config.metadata_fields.clone(),
        };

        info!("Starting subtitle download for {}", video_id);
        let outcome = self.client.submit(&request).await;
        let now = self.clock.now();

        let apply = |record: &mut JobRecord| match &outcome {
            Ok(id) => record.mark_submitted(id.clone(), now),
            Err(error) => record.mark_failed(error.clone(), now),
        };

        let record = self
            .cache
            .update(video_id, |r| {
                if r.phase == JobPhase::Pending && r.external_job_id.is_none() {
                    apply(r);
                }
            })
            .unwrap_or_else(|| {
                warn!("Job record for {} was evicted during submission", video_id);
                let mut detached = pending;
                apply(&mut detached);
                detached
            });

        match outcome {
            Ok(id) => {
                info!("Download job {} created for {}", id, video_id);
                Ok((id, record))
            }
            Err(error) => {
                warn!("Submission failed for {}: {}", video_id, error);
                Err(record)
            }
        }
    }

    /// Poll until the record is terminal or the attempt bound is exhausted.
    async fn poll_until_terminal(
        &self,
        video_id: &str,
        external_job_id: &str,
        mut last: JobRecord,
    ) -> JobRecord {
        let policy = &self.config.poll;

        for attempt in 1..=policy.max_attempts {
            // An event may have settled or replaced the job while we slept.
            match self.cache.get(video_id) {
                Some(current) if current.external_job_id.as_deref() != Some(external_job_id) => {
                    debug!("Job {} superseded for {}", external_job_id, video_id);
                    return current;
                }
                Some(current) if current.phase.is_terminal() => return current,
                Some(current) => last = current,
                None => {
                    warn!("Job record for {} was evicted while polling", video_id);
                    return last;
                }
            }

            match self.client.poll_once(external_job_id).await {
                Ok(status) => {
                    debug!("Job {} attempt {}/{}: {:?}", external_job_id, attempt, policy.max_attempts, status);
                    if let Some(current) = self.apply_status(video_id, external_job_id, status).await {
                        if current.phase.is_terminal() {
                            return current;
                        }
                        last = current;
                    }
                }
                Err(error) if error.is_transient() => {
                    warn!(
                        "Status check for job {} failed (attempt {}/{}): {}",
                        external_job_id, attempt, policy.max_attempts, error
                    );
                }
                Err(error) => {
                    warn!("Status check for job {} failed: {}", external_job_id, error);
                    return self.fail(video_id, external_job_id, error).unwrap_or(last);
                }
            }

            if attempt < policy.max_attempts {
                self.clock.sleep(policy.delay_after(attempt)).await;
            }
        }

        warn!(
            "Job {} for {} timed out after {} attempts",
            external_job_id, video_id, policy.max_attempts
        );
        self.fail(
            video_id,
            external_job_id,
            JobError::TimedOut {
                attempts: policy.max_attempts,
            },
        )
        .unwrap_or(last)
    }

    /// Apply one normalized status to the stored record.
    async fn apply_status(
        &self,
        video_id: &str,
        external_job_id: &str,
        status: ExternalStatus,
    ) -> Option<JobRecord> {
        let now = self.clock.now();

        match status {
            ExternalStatus::Queued => self.transition(video_id, external_job_id, JobPhase::Polling, |r| {
                r.mark_polling(None, now)
            }),
            ExternalStatus::Running { progress } => {
                if let Some(progress) = progress {
                    info!("Job {} progress: {}", external_job_id, progress);
                }
                self.transition(video_id, external_job_id, JobPhase::Polling, |r| {
                    r.mark_polling(progress, now)
                })
            }
            ExternalStatus::Finished { outputs } => {
                let materialized = self.materialize(&outputs).await;
                let now = self.clock.now();
                match materialized {
                    Ok(transcript) => {
                        info!(
                            "Job {} finished: {} segments for {}",
                            external_job_id,
                            transcript.len(),
                            video_id
                        );
                        self.transition(video_id, external_job_id, JobPhase::Ready, |r| {
                            r.mark_ready(transcript, now)
                        })
                    }
                    Err(error) => {
                        warn!("Job {} finished without a usable transcript: {}", external_job_id, error);
                        self.fail(video_id, external_job_id, error)
                    }
                }
            }
            ExternalStatus::Failed { reason } => {
                warn!("Job {} failed: {}", external_job_id, reason);
                self.fail(video_id, external_job_id, JobError::JobFailed(reason))
            }
        }
    }

    /// Locate, fetch and parse the subtitle artifact.
    async fn materialize(&self, outputs: &Outputs) -> std::result::Result<Transcript, JobError> {
        let language = &self.config.subtitle_language;
        let artifact = outputs
            .get(language)
            .or_else(|| {
                let prefix = format!("{}-", language);
                outputs
                    .iter()
                    .find(|(slot, _)| slot.starts_with(&prefix))
                    .map(|(_, artifact)| artifact)
            })
            .ok_or_else(|| {
                JobError::ArtifactMissing(format!(
                    "No '{}' subtitle track among {} job outputs",
                    language,
                    outputs.len()
                ))
            })?;

        debug!("Fetching subtitles from {}", artifact.url);
        let body = self.client.fetch_artifact(&artifact.url).await?;

        let segments = parse_vtt(&body);
        if segments.is_empty() {
            return Err(JobError::ArtifactMissing(
                "Subtitle track contained no cues".to_string(),
            ));
        }

        Ok(Transcript::new(segments))
    }

    fn fail(&self, video_id: &str, external_job_id: &str, error: JobError) -> Option<JobRecord> {
        let now = self.clock.now();
        self.transition(video_id, external_job_id, JobPhase::Failed, |r| {
            r.mark_failed(error, now)
        })
    }

    /// Compare-and-set style transition: applies only if the stored record
    /// still belongs to `external_job_id` and `next` is a legal step.
    /// Returns the stored record afterwards, changed or not.
    fn transition<F>(
        &self,
        video_id: &str,
        external_job_id: &str,
        next: JobPhase,
        apply: F,
    ) -> Option<JobRecord>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut applied = false;
        let current = self.cache.update(video_id, |record| {
            if record.external_job_id.as_deref() == Some(external_job_id)
                && record.phase.can_transition_to(next)
            {
                apply(record);
                applied = true;
            }
        })?;

        if !applied {
            debug!(
                "Skipped transition {} -> {} for {} (job {:?})",
                current.phase, next, video_id, current.external_job_id
            );
        }
        Some(current)
    }
}
