//! Sievetube - chat with YouTube videos
//!
//! Fetches a video's subtitles through an external Sieve job, keeps the
//! timestamped transcript in a job cache, and answers questions about the
//! video with an OpenAI-compatible chat model.
//!
//! # Architecture
//!
//! - `video` - Video ID extraction, watch URLs, YouTube Data API metadata
//! - `subtitle` - WebVTT parsing
//! - `transcript` - Transcript segments, timestamp formatting, citations
//! - `job` - Job lifecycle records and the failure taxonomy
//! - `cache` - In-memory job cache with JSON snapshots
//! - `provider` - External job client (Sieve) and status normalization
//! - `orchestrator` - Submission, deduplication, polling and events
//! - `chat` - Question answering over a cached transcript
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use sievetube::cache::JobCache;
//! use sievetube::config::Settings;
//! use sievetube::orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings, Arc::new(JobCache::new()))?;
//!
//!     let record = orchestrator.submit_or_fetch("dQw4w9WgXcQ").await?;
//!     if let Some(transcript) = record.ready_transcript() {
//!         println!("{}", transcript.format_with_timestamps());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod openai;
pub mod orchestrator;
pub mod provider;
pub mod subtitle;
pub mod transcript;
pub mod video;

pub use error::{Result, SievetubeError};
