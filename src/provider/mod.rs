//! External job provider abstraction.
//!
//! The orchestrator only sees the normalized [`ExternalStatus`] produced here;
//! raw provider status strings never leave this module.

mod sieve;
pub mod status;

pub use sieve::{JobEvent, SieveClient};
pub use status::{normalize_status, StatusClass};

use crate::job::JobError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result type for provider calls. Errors are already classified.
pub type JobResult<T> = std::result::Result<T, JobError>;

/// What the external job should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Subtitles,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Subtitles => write!(f, "subtitles"),
        }
    }
}

/// A job submission.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// Media URL the provider downloads from.
    pub source_url: String,
    pub artifact: ArtifactKind,
    /// Metadata fields the provider should include in its outputs.
    pub metadata_fields: Vec<String>,
}

/// An output resource attached to a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Finished-job outputs by slot ID (e.g. a subtitle language code).
pub type Outputs = BTreeMap<String, Artifact>;

/// Normalized job status, independent of the provider's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExternalStatus {
    Queued,
    Running {
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
    },
    Finished {
        outputs: Outputs,
    },
    Failed {
        reason: String,
    },
}

impl ExternalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExternalStatus::Finished { .. } | ExternalStatus::Failed { .. })
    }
}

/// Client for an asynchronous job provider.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submit a job and return the provider's job ID.
    async fn submit(&self, request: &JobRequest) -> JobResult<String>;

    /// Check a job once.
    async fn poll_once(&self, external_job_id: &str) -> JobResult<ExternalStatus>;

    /// Download an artifact body. Any failure is [`JobError::MalformedInput`].
    async fn fetch_artifact(&self, url: &str) -> JobResult<String>;
}
