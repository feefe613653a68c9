//! Configuration settings for Sievetube.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when `sieve.api_key` is unset.
pub const SIEVE_API_KEY_ENV: &str = "SIEVE_API_KEY";
/// Environment variable consulted when `chat.api_key` is unset.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
/// Environment variable consulted when `youtube.api_key` is unset.
pub const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub sieve: SieveSettings,
    pub polling: PollingSettings,
    pub cache: CacheSettings,
    pub chat: ChatSettings,
    pub youtube: YoutubeSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Timeout for every outbound HTTP request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sievetube".to_string(),
            log_level: "info".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl GeneralSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Sieve job provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SieveSettings {
    /// Base URL of the Sieve v2 API.
    pub api_url: String,
    /// API key. Falls back to `SIEVE_API_KEY`.
    pub api_key: Option<String>,
    /// Sieve function that downloads the video's subtitles.
    pub function: String,
    /// Subtitle language to request and read from the job outputs.
    pub subtitle_language: String,
    /// Metadata fields included in the job outputs.
    pub metadata_fields: Vec<String>,
}

impl Default for SieveSettings {
    fn default() -> Self {
        Self {
            api_url: "https://mango.sievedata.com/v2".to_string(),
            api_key: None,
            function: "sieve/youtube-downloader".to_string(),
            subtitle_language: "en".to_string(),
            metadata_fields: vec![
                "title".to_string(),
                "description".to_string(),
                "duration".to_string(),
            ],
        }
    }
}

/// Polling schedule for external jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Delay between status checks, in milliseconds.
    pub interval_ms: u64,
    /// Status checks before a job is declared timed out.
    pub max_attempts: u32,
    /// Multiplier applied to the delay after each check (1.0 = fixed).
    pub backoff_factor: f64,
    /// Upper bound for the grown delay, in milliseconds.
    pub max_interval_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_attempts: 60,
            backoff_factor: 1.0,
            max_interval_ms: 10_000,
        }
    }
}

/// Job cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Age after which a job record is discarded, in seconds.
    pub ttl_seconds: u64,
    /// Persist the cache to disk between runs.
    pub persist: bool,
    /// Snapshot file. Defaults to `jobs.json` in the data directory.
    pub snapshot_path: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            persist: true,
            snapshot_path: None,
        }
    }
}

impl CacheSettings {
    /// Largest TTL `chrono::Duration` can hold in whole seconds.
    const MAX_TTL_SECONDS: u64 = (i64::MAX / 1000) as u64;

    /// The record TTL, clamped so oversized values never overflow.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds.min(Self::MAX_TTL_SECONDS) as i64)
    }
}

/// Chat completion settings (any OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// API key. Falls back to `GROQ_API_KEY`.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 1.0,
        }
    }
}

/// YouTube-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct YoutubeSettings {
    /// YouTube Data API key (optional, for video metadata). Falls back to `YOUTUBE_API_KEY`.
    pub api_key: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// Configured value, else a non-empty environment variable.
fn key_or_env(configured: &Option<String>, env: &str) -> Option<String> {
    configured
        .as_ref()
        .filter(|k| !k.trim().is_empty())
        .cloned()
        .or_else(|| std::env::var(env).ok().filter(|k| !k.trim().is_empty()))
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SievetubeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sievetube")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Where the job cache is persisted, if persistence is enabled.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        if !self.cache.persist {
            return None;
        }
        Some(match &self.cache.snapshot_path {
            Some(path) => Self::expand_path(path),
            None => self.data_dir().join("jobs.json"),
        })
    }

    pub fn sieve_api_key(&self) -> Option<String> {
        key_or_env(&self.sieve.api_key, SIEVE_API_KEY_ENV)
    }

    pub fn chat_api_key(&self) -> Option<String> {
        key_or_env(&self.chat.api_key, GROQ_API_KEY_ENV)
    }

    pub fn youtube_api_key(&self) -> Option<String> {
        key_or_env(&self.youtube.api_key, YOUTUBE_API_KEY_ENV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_ttl_is_clamped() {
        let mut cache = CacheSettings::default();
        assert_eq!(cache.ttl(), chrono::Duration::seconds(3600));

        cache.ttl_seconds = u64::MAX;
        let ttl = cache.ttl();
        assert!(ttl > chrono::Duration::zero());
        assert_eq!(ttl.num_seconds(), i64::MAX / 1000);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.polling.interval_ms, 2000);
        assert_eq!(settings.polling.max_attempts, 60);
        assert_eq!(settings.cache.ttl_seconds, 3600);
        assert_eq!(settings.chat.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [polling]
            max_attempts = 5

            [sieve]
            api_key = "sk-test"
            "#,
        )
        .unwrap();

        assert_eq!(settings.polling.max_attempts, 5);
        assert_eq!(settings.polling.interval_ms, 2000);
        assert_eq!(settings.sieve_api_key().as_deref(), Some("sk-test"));
        assert_eq!(settings.sieve.function, "sieve/youtube-downloader");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 8080;
        settings.cache.persist = false;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 8080);
        assert!(loaded.snapshot_path().is_none());
    }

    #[test]
    fn test_snapshot_path_defaults_to_data_dir() {
        let mut settings = Settings::default();
        settings.general.data_dir = "/var/lib/sievetube".to_string();
        assert_eq!(
            settings.snapshot_path(),
            Some(PathBuf::from("/var/lib/sievetube/jobs.json"))
        );
    }

    #[test]
    fn test_blank_key_is_unset() {
        assert_eq!(key_or_env(&Some("  ".to_string()), "SIEVETUBE_TEST_UNSET_VAR"), None);
        assert_eq!(
            key_or_env(&Some("abc".to_string()), "SIEVETUBE_TEST_UNSET_VAR").as_deref(),
            Some("abc")
        );
    }
}
