//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::{Settings, GROQ_API_KEY_ENV, SIEVE_API_KEY_ENV};
use crate::error::{Result, SievetubeError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Processing a video requires the Sieve key.
    Process,
    /// Asking questions requires both keys.
    Ask,
    /// The server requires both keys.
    Serve,
    /// A one-off status check requires the Sieve key.
    Status,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Process | Operation::Status => {
            require(settings.sieve_api_key(), SIEVE_API_KEY_ENV, "sieve.api_key")?;
        }
        Operation::Ask | Operation::Serve => {
            require(settings.sieve_api_key(), SIEVE_API_KEY_ENV, "sieve.api_key")?;
            require(settings.chat_api_key(), GROQ_API_KEY_ENV, "chat.api_key")?;
        }
    }
    Ok(())
}

fn require(key: Option<String>, env: &str, config_key: &str) -> Result<()> {
    match key {
        Some(_) => Ok(()),
        None => Err(SievetubeError::Config(format!(
            "{} not set. Set it with: export {}='...' (or {} in the config file)",
            env, env, config_key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_keys_pass() {
        let mut settings = Settings::default();
        settings.sieve.api_key = Some("sieve-key".to_string());
        settings.chat.api_key = Some("groq-key".to_string());

        assert!(check(Operation::Process, &settings).is_ok());
        assert!(check(Operation::Ask, &settings).is_ok());
    }

    #[test]
    fn test_missing_key_names_variable() {
        let err = require(None, SIEVE_API_KEY_ENV, "sieve.api_key").unwrap_err();
        assert!(err.to_string().contains("SIEVE_API_KEY"));
    }
}
