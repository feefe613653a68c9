//! Error types for Sievetube.

use crate::job::JobError;
use thiserror::Error;

/// Library-level error type for Sievetube operations.
#[derive(Error, Debug)]
pub enum SievetubeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transcript not ready for video {0}")]
    TranscriptNotReady(String),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Video info error: {0}")]
    VideoInfo(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Sievetube operations.
pub type Result<T> = std::result::Result<T, SievetubeError>;
