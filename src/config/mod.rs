//! Configuration module for Sievetube.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ChatPrompts, Prompts};
pub use settings::{
    CacheSettings, ChatSettings, GeneralSettings, PollingSettings, PromptSettings,
    ServerSettings, Settings, SieveSettings, YoutubeSettings, GROQ_API_KEY_ENV,
    SIEVE_API_KEY_ENV, YOUTUBE_API_KEY_ENV,
};
