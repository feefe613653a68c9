//! Client construction for outbound HTTP and OpenAI-compatible chat APIs.

use crate::error::{Result, SievetubeError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a reqwest client with the given request timeout.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sievetube/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SievetubeError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create an OpenAI-compatible client for `api_base` with a custom timeout.
pub fn create_client_with_timeout(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(create_http_client(timeout)?))
}

