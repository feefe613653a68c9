//! Chat completion backends.

use super::{ChatMessage, Role};
use crate::config::Settings;
use crate::error::{Result, SievetubeError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::debug;

/// A model that continues a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the assistant's reply. May be empty if the model produced nothing.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Chat model served by an OpenAI-compatible API (Groq by default).
pub struct OpenAiChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

impl OpenAiChatModel {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.chat_api_key().ok_or_else(|| {
            SievetubeError::Config(
                "Chat API key not configured. Set GROQ_API_KEY or chat.api_key.".to_string(),
            )
        })?;

        let client = create_client_with_timeout(
            &settings.chat.api_base,
            &api_key,
            settings.general.request_timeout(),
        )?;

        Ok(Self {
            client,
            model: settings.chat.model.clone(),
            temperature: settings.chat.temperature,
            max_tokens: settings.chat.max_tokens,
            top_p: settings.chat.top_p,
        })
    }

    fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
        let content = message.content.clone();
        let built: ChatCompletionRequestMessage = match message.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| SievetubeError::Chat(e.to_string()))?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| SievetubeError::Chat(e.to_string()))?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| SievetubeError::Chat(e.to_string()))?
                .into(),
        };
        Ok(built)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| SievetubeError::Chat(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SievetubeError::OpenAI(format!("Failed to generate response: {}", e)))?;

        debug!("Chat completion used model {}", response.model);

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
