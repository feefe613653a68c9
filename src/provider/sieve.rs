//! Sieve job API client.
//!
//! Submits `youtube-downloader` jobs via `POST /push` and polls them via
//! `GET /jobs/{id}`.

use super::status::{normalize_status, StatusClass};
use super::{Artifact, ExternalStatus, JobClient, JobRequest, JobResult, Outputs};
use crate::job::JobError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// Maximum number of response-body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP client for the Sieve job API.
pub struct SieveClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    function: String,
}

impl SieveClient {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            function: function.into(),
        }
    }

    fn submit_body(&self, request: &JobRequest) -> Value {
        json!({
            "function": self.function,
            "inputs": {
                "url": request.source_url,
                "download_type": request.artifact.to_string(),
                "include_metadata": !request.metadata_fields.is_empty(),
                "metadata_fields": request.metadata_fields,
                "include_subtitles": true,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Job document returned by `GET /jobs/{id}`.
#[derive(Debug, Deserialize)]
struct JobDocument {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    outputs: Option<Value>,
    #[serde(default)]
    progress: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Out-of-band job notification pushed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Provider job ID.
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl JobEvent {
    /// Normalize the event into a status the orchestrator can apply.
    ///
    /// Returns `None` when the event carries nothing actionable: no status, or
    /// a finished status without outputs (the polling loop fetches those).
    pub fn external_status(&self) -> Option<ExternalStatus> {
        if let Some(reason) = self.error.as_ref().and_then(error_text) {
            return Some(ExternalStatus::Failed { reason });
        }

        let raw = self.status.as_deref()?;
        if normalize_status(raw) == StatusClass::Finished && self.outputs.is_none() {
            return None;
        }

        Some(classify(
            raw,
            self.outputs.as_ref(),
            None,
            self.error.as_ref(),
        ))
    }
}

/// Build an [`ExternalStatus`] from raw job fields.
fn classify(
    raw_status: &str,
    outputs: Option<&Value>,
    progress: Option<&Value>,
    error: Option<&Value>,
) -> ExternalStatus {
    match normalize_status(raw_status) {
        StatusClass::Queued => ExternalStatus::Queued,
        StatusClass::Running => ExternalStatus::Running {
            progress: progress.and_then(progress_value),
        },
        StatusClass::Finished => ExternalStatus::Finished {
            outputs: flatten_outputs(outputs),
        },
        StatusClass::Failed => ExternalStatus::Failed {
            reason: error
                .and_then(error_text)
                .unwrap_or_else(|| "Unknown error".to_string()),
        },
    }
}

fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

fn progress_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

/// Flatten provider outputs into slots.
///
/// `[{ "type": .., "data": { "url": .. } }]` yields slot `"<index>"`;
/// `[{ "data": { "en": { "url": .. } } }]` yields slot `"en"`. The first
/// occurrence of a slot wins.
fn flatten_outputs(outputs: Option<&Value>) -> Outputs {
    let mut slots = Outputs::new();

    let Some(outputs) = outputs else {
        return slots;
    };

    let entries: Vec<&Value> = match outputs {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![outputs],
        _ => Vec::new(),
    };

    for (index, output) in entries.into_iter().enumerate() {
        let type_tag = output["type"].as_str().map(str::to_string);
        let data = if output.get("data").is_some() {
            &output["data"]
        } else {
            output
        };

        if let Some(url) = data["url"].as_str() {
            slots.entry(index.to_string()).or_insert_with(|| Artifact {
                url: url.to_string(),
                kind: type_tag.clone(),
            });
        }

        if let Some(map) = data.as_object() {
            for (slot, value) in map {
                if let Some(url) = value["url"].as_str() {
                    slots.entry(slot.clone()).or_insert_with(|| Artifact {
                        url: url.to_string(),
                        kind: value["ext"]
                            .as_str()
                            .map(str::to_string)
                            .or_else(|| type_tag.clone()),
                    });
                }
            }
        }
    }

    slots
}

/// Map an HTTP failure status to the job error taxonomy.
fn status_error(status: StatusCode, body: &str, action: &str) -> JobError {
    let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let message = format!("{} failed with {}: {}", action, status, excerpt);
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        JobError::InvalidRequest(message)
    } else {
        JobError::ProviderUnavailable(message)
    }
}

#[async_trait]
impl JobClient for SieveClient {
    #[instrument(skip(self, request), fields(source_url = %request.source_url))]
    async fn submit(&self, request: &JobRequest) -> JobResult<String> {
        let response = self
            .http
            .post(format!("{}/push", self.api_url))
            .header("X-API-Key", &self.api_key)
            .json(&self.submit_body(request))
            .send()
            .await
            .map_err(|e| JobError::ProviderUnavailable(format!("Failed to reach provider: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, "Job submission"));
        }

        let submitted: SubmitResponse = response.json().await.map_err(|e| {
            JobError::ProviderUnavailable(format!("Invalid response from provider: {}", e))
        })?;

        let id = submitted
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                JobError::ProviderUnavailable("Provider response did not include a job id".to_string())
            })?;

        debug!("Submitted job {}", id);
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn poll_once(&self, external_job_id: &str) -> JobResult<ExternalStatus> {
        let response = self
            .http
            .get(format!("{}/jobs/{}", self.api_url, external_job_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| JobError::ProviderUnavailable(format!("Failed to reach provider: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, "Job status check"));
        }

        let document: JobDocument = response.json().await.map_err(|e| {
            JobError::ProviderUnavailable(format!("Invalid job status response: {}", e))
        })?;

        Ok(document.into_status())
    }

    #[instrument(skip(self))]
    async fn fetch_artifact(&self, url: &str) -> JobResult<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| JobError::MalformedInput(format!("Failed to fetch artifact: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::MalformedInput(format!(
                "Failed to fetch artifact: {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| JobError::MalformedInput(format!("Failed to read artifact: {}", e)))
    }
}

impl JobDocument {
    fn into_status(self) -> ExternalStatus {
        classify(
            self.status.as_deref().unwrap_or_default(),
            self.outputs.as_ref(),
            self.progress.as_ref(),
            self.error.as_ref(),
        )
    }
}
