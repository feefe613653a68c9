//! Ask command implementation.

use super::process::fetch_transcript;
use crate::chat::{ChatMessage, ChatRequest, ChatService, OpenAiChatModel, VideoMetadata};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::job::JobPhase;
use crate::openai::create_http_client;
use crate::transcript::extract_citations;
use crate::video::VideoInfoClient;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, title: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'sievetube doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let record = fetch_transcript(video, &settings).await?;
    if record.phase != JobPhase::Ready {
        let message = record.user_message().unwrap_or("Video is still processing.");
        Output::error(message);
        if let Some(error) = &record.error {
            Output::kv("Reason", &error.to_string());
        }
        anyhow::bail!("No transcript available for {}", record.video_id);
    }

    let title = match title {
        Some(title) => title,
        None => lookup_title(&record.video_id, &settings).await,
    };

    // Chat reads from a cache holding just this record.
    let cache = Arc::new(crate::cache::JobCache::new());
    cache.put(&record.video_id, record.clone());

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let service = ChatService::new(cache, Arc::new(OpenAiChatModel::new(&settings)?))
        .with_prompts(prompts);

    let request = ChatRequest {
        messages: vec![ChatMessage::user(question)],
        video_id: record.video_id.clone(),
        video_metadata: VideoMetadata {
            title,
            ..VideoMetadata::default()
        },
    };

    let spinner = Output::spinner("Thinking...");
    let response = service.answer(&request).await;
    spinner.finish_and_clear();

    match response {
        Ok(response) => {
            println!("\n{}\n", response.response);

            let citations = extract_citations(&response.response, &record.video_id);
            if !citations.is_empty() {
                Output::header("Timestamps");
                for citation in &citations {
                    Output::citation(citation);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Best-effort title lookup. Falls back to the video ID.
async fn lookup_title(video_id: &str, settings: &Settings) -> String {
    let Some(api_key) = settings.youtube_api_key() else {
        return video_id.to_string();
    };

    let client = match create_http_client(settings.general.request_timeout()) {
        Ok(http) => VideoInfoClient::new(http, api_key),
        Err(_) => return video_id.to_string(),
    };

    match client.fetch(video_id).await {
        Ok(info) if !info.title.is_empty() => info.title,
        Ok(_) => video_id.to_string(),
        Err(e) => {
            Output::warning(&format!("Could not look up video title: {}", e));
            video_id.to_string()
        }
    }
}
