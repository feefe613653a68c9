//! Job lifecycle records.
//!
//! One [`JobRecord`] exists per video. Its serde schema is also the on-disk
//! snapshot format used by the cache.

use crate::transcript::Transcript;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown to users for any failed job. Details stay in [`JobRecord::error`].
pub const FAILED_USER_MESSAGE: &str =
    "We couldn't process this video. Please try again or pick a different video.";

/// Lifecycle phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    Pending,
    Submitted,
    Polling,
    Ready,
    Failed,
}

impl JobPhase {
    /// `Ready` and `Failed` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Ready | JobPhase::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step of the state machine.
    pub fn can_transition_to(self, next: JobPhase) -> bool {
        use JobPhase::*;
        matches!(
            (self, next),
            (Pending, Submitted)
                | (Pending, Failed)
                | (Submitted, Polling)
                | (Submitted, Ready)
                | (Submitted, Failed)
                | (Polling, Polling)
                | (Polling, Ready)
                | (Polling, Failed)
        )
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Pending => write!(f, "pending"),
            JobPhase::Submitted => write!(f, "submitted"),
            JobPhase::Polling => write!(f, "polling"),
            JobPhase::Ready => write!(f, "ready"),
            JobPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Failure taxonomy for orchestration. Every terminal failure lands in a record.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum JobError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Timed out after {attempts} poll attempts")]
    TimedOut { attempts: u32 },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Job failed: {0}")]
    JobFailed(String),
}

impl JobError {
    /// Failures worth resubmitting on the next request.
    ///
    /// A missing artifact or a rejected request would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            JobError::ArtifactMissing(_) | JobError::InvalidRequest(_)
        )
    }

    /// Poll errors that consume an attempt but keep the loop running.
    pub fn is_transient(&self) -> bool {
        matches!(self, JobError::ProviderUnavailable(_))
    }
}

/// Lifecycle state for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_job_id: Option<String>,
    pub phase: JobPhase,
    pub created_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
    /// Last progress value reported by the provider. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobRecord {
    /// A fresh record for a video about to be submitted.
    pub fn pending(video_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            video_id: video_id.into(),
            external_job_id: None,
            phase: JobPhase::Pending,
            created_at: now,
            last_checked_at: now,
            progress: None,
            transcript: None,
            error: None,
        }
    }

    /// True once `ttl` has elapsed since `created_at`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }

    /// The transcript, if the job reached `Ready`.
    pub fn ready_transcript(&self) -> Option<&Transcript> {
        match self.phase {
            JobPhase::Ready => self.transcript.as_ref(),
            _ => None,
        }
    }

    /// Stable, user-facing text for failed jobs.
    pub fn user_message(&self) -> Option<&'static str> {
        (self.phase == JobPhase::Failed).then_some(FAILED_USER_MESSAGE)
    }

    /// Record the external job id after a successful submission.
    pub fn mark_submitted(&mut self, external_job_id: impl Into<String>, now: DateTime<Utc>) {
        self.external_job_id = Some(external_job_id.into());
        self.phase = JobPhase::Submitted;
        self.last_checked_at = now;
    }

    /// Note a non-terminal poll result.
    pub fn mark_polling(&mut self, progress: Option<f64>, now: DateTime<Utc>) {
        self.phase = JobPhase::Polling;
        self.last_checked_at = now;
        if progress.is_some() {
            self.progress = progress;
        }
    }

    pub fn mark_ready(&mut self, transcript: Transcript, now: DateTime<Utc>) {
        self.phase = JobPhase::Ready;
        self.last_checked_at = now;
        self.transcript = Some(transcript);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: JobError, now: DateTime<Utc>) {
        self.phase = JobPhase::Failed;
        self.last_checked_at = now;
        self.transcript = None;
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;

    #[test]
    fn test_transition_table() {
        use JobPhase::*;
        assert!(Pending.can_transition_to(Submitted));
        assert!(Pending.can_transition_to(Failed));
        assert!(Submitted.can_transition_to(Ready));
        assert!(Polling.can_transition_to(Polling));

        assert!(!Pending.can_transition_to(Polling));
        assert!(!Pending.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Polling));
        assert!(!Failed.can_transition_to(Submitted));
        assert!(!Polling.can_transition_to(Submitted));
    }

    #[test]
    fn test_expiry() {
        let created = Utc::now();
        let record = JobRecord::pending("abc", created);
        let ttl = Duration::seconds(3600);

        assert!(!record.is_expired(created + Duration::seconds(3600), ttl));
        assert!(record.is_expired(created + Duration::seconds(3601), ttl));
    }

    #[test]
    fn test_serialized_shape() {
        let now = Utc::now();
        let mut record = JobRecord::pending("abc", now);
        record.mark_submitted("job-1", now);
        record.mark_failed(JobError::TimedOut { attempts: 60 }, now);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["videoId"], "abc");
        assert_eq!(json["externalJobId"], "job-1");
        assert_eq!(json["phase"], "Failed");
        assert_eq!(json["error"]["kind"], "TimedOut");
        assert_eq!(json["error"]["detail"]["attempts"], 60);
        assert!(json.get("transcript").is_none());

        let back: JobRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_ready_transcript_and_message() {
        let now = Utc::now();
        let mut record = JobRecord::pending("abc", now);
        assert!(record.ready_transcript().is_none());
        assert!(record.user_message().is_none());

        record.mark_submitted("job-1", now);
        record.mark_ready(Transcript::new(vec![TranscriptSegment::new(1, "hi")]), now);
        assert_eq!(record.ready_transcript().map(|t| t.len()), Some(1));

        record.phase = JobPhase::Failed;
        assert_eq!(record.user_message(), Some(FAILED_USER_MESSAGE));
    }

    #[test]
    fn test_error_classification() {
        assert!(JobError::TimedOut { attempts: 1 }.is_retryable());
        assert!(JobError::ProviderUnavailable("503".into()).is_retryable());
        assert!(!JobError::ArtifactMissing("no en".into()).is_retryable());
        assert!(JobError::ProviderUnavailable("503".into()).is_transient());
        assert!(!JobError::JobFailed("boom".into()).is_transient());
    }
}
