//! HTTP API server for the chat front end.
//!
//! Provides REST endpoints for video processing, job events, and chat.

use crate::cache::JobCache;
use crate::chat::{ChatRequest, ChatService, OpenAiChatModel};
use crate::cli::preflight::{self, Operation};
use crate::cli::{load_cache, save_cache, Output};
use crate::config::{Prompts, Settings};
use crate::error::SievetubeError;
use crate::job::{JobError, JobRecord};
use crate::openai::create_http_client;
use crate::orchestrator::Orchestrator;
use crate::provider::JobEvent;
use crate::transcript::TranscriptSegment;
use crate::video::VideoInfoClient;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    chat: ChatService,
    video_info: Option<VideoInfoClient>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'sievetube doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let cache = load_cache(&settings);
    let state = Arc::new(build_state(&settings, cache.clone())?);

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Sievetube API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Process video", "POST /api/process-video");
    Output::kv("Job status", "POST /api/job-status");
    Output::kv("Job events", "POST /api/job-events");
    Output::kv("Chat", "POST /api/chat");
    Output::kv("Transcript", "GET  /api/transcript/{video_id}");
    Output::kv("Video info", "GET  /api/video-info/{video_id}");
    Output::kv("Jobs", "GET  /api/jobs");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    save_cache(&settings, &cache)?;
    Output::success("Server stopped.");

    Ok(())
}

fn build_state(settings: &Settings, cache: Arc<JobCache>) -> anyhow::Result<AppState> {
    let orchestrator = Orchestrator::new(settings, cache.clone())?;

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let chat = ChatService::new(cache, Arc::new(OpenAiChatModel::new(settings)?))
        .with_prompts(prompts)
        .with_ttl(settings.cache.ttl());

    let video_info = match settings.youtube_api_key() {
        Some(key) => Some(VideoInfoClient::new(
            create_http_client(settings.general.request_timeout())?,
            key,
        )),
        None => None,
    };

    Ok(AppState {
        orchestrator,
        chat,
        video_info,
    })
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/process-video", post(process_video))
        .route("/api/job-status", post(job_status))
        .route("/api/job-events", post(job_events))
        .route("/api/chat", post(chat))
        .route("/api/transcript/{video_id}", get(transcript))
        .route("/api/video-info/{video_id}", get(video_info))
        .route("/api/jobs", get(list_jobs))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// === Request/Response Types ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessVideoRequest {
    video_id: String,
}

#[derive(Serialize)]
struct ProcessVideoResponse {
    #[serde(flatten)]
    record: JobRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl From<JobRecord> for ProcessVideoResponse {
    fn from(record: JobRecord) -> Self {
        let message = record.user_message();
        Self { record, message }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusRequest {
    job_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptResponse {
    video_id: String,
    segments: Vec<TranscriptSegment>,
    text: String,
}

#[derive(Serialize)]
struct JobListResponse {
    jobs: Vec<JobRecord>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Maps library errors onto HTTP status codes.
struct ApiError(SievetubeError);

impl From<SievetubeError> for ApiError {
    fn from(err: SievetubeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            SievetubeError::InvalidRequest(_) | SievetubeError::Job(JobError::InvalidRequest(_)) => {
                StatusCode::BAD_REQUEST
            }
            SievetubeError::TranscriptNotReady(_) => StatusCode::NOT_FOUND,
            SievetubeError::Job(_) | SievetubeError::VideoInfo(_) | SievetubeError::OpenAI(_) => {
                StatusCode::BAD_GATEWAY
            }
            SievetubeError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessVideoRequest>,
) -> ApiResult<ProcessVideoResponse> {
    let record = state.orchestrator.submit_or_fetch(&req.video_id).await?;
    Ok(Json(record.into()))
}

async fn job_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JobStatusRequest>,
) -> ApiResult<crate::provider::ExternalStatus> {
    Ok(Json(state.orchestrator.job_status(&req.job_id).await?))
}

async fn job_events(
    State(state): State<Arc<AppState>>,
    Json(event): Json<JobEvent>,
) -> impl IntoResponse {
    Json(state.orchestrator.handle_event(event).await)
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<crate::chat::ChatResponse> {
    Ok(Json(state.chat.answer(&req).await?))
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> ApiResult<TranscriptResponse> {
    let transcript = state.orchestrator.transcript(&video_id)?;
    Ok(Json(TranscriptResponse {
        text: transcript.format_with_timestamps(),
        segments: transcript.segments().to_vec(),
        video_id,
    }))
}

async fn video_info(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> ApiResult<crate::video::VideoInfo> {
    let client = state.video_info.as_ref().ok_or_else(|| {
        SievetubeError::Config(
            "YouTube API key not configured. Set YOUTUBE_API_KEY or youtube.api_key.".to_string(),
        )
    })?;
    Ok(Json(client.fetch(&video_id).await?))
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<JobListResponse> {
    let mut jobs: Vec<JobRecord> = state
        .orchestrator
        .cache()
        .entries()
        .map(|(_, record)| record)
        .collect();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(JobListResponse {
        total: jobs.len(),
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (SievetubeError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                SievetubeError::Job(JobError::InvalidRequest("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (SievetubeError::TranscriptNotReady("x".into()), StatusCode::NOT_FOUND),
            (
                SievetubeError::Job(JobError::ProviderUnavailable("x".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (SievetubeError::Config("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (SievetubeError::Chat("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_failed_record_carries_user_message() {
        let mut record = JobRecord::pending("abc", Utc::now());
        record.mark_failed(JobError::TimedOut { attempts: 60 }, Utc::now());

        let json = serde_json::to_value(ProcessVideoResponse::from(record)).unwrap();

        assert_eq!(json["videoId"], "abc");
        assert_eq!(json["phase"], "Failed");
        assert_eq!(json["error"]["kind"], "TimedOut");
        assert_eq!(json["message"], crate::job::FAILED_USER_MESSAGE);
    }

    #[test]
    fn test_pending_record_has_no_message() {
        let record = JobRecord::pending("abc", Utc::now());
        let json = serde_json::to_value(ProcessVideoResponse::from(record)).unwrap();
        assert!(json.get("message").is_none());
    }
}
