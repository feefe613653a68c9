//! Doctor command - verify configuration and API keys.

use crate::cli::Output;
use crate::config::{Settings, GROQ_API_KEY_ENV, SIEVE_API_KEY_ENV, YOUTUBE_API_KEY_ENV};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Sievetube Doctor");
    println!();
    println!("Checking configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Keys").bold());
    let key_checks = vec![
        check_key(SIEVE_API_KEY_ENV, settings.sieve_api_key(), true),
        check_key(GROQ_API_KEY_ENV, settings.chat_api_key(), true),
        check_key(YOUTUBE_API_KEY_ENV, settings.youtube_api_key(), false),
    ];
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Endpoints").bold());
    let endpoint_checks = vec![
        check_url("Sieve API", &settings.sieve.api_url),
        check_url("Chat API", &settings.chat.api_base),
    ];
    for check in &endpoint_checks {
        check.print();
    }
    checks.extend(endpoint_checks);

    println!();

    println!("{}", style("Storage").bold());
    let storage = check_snapshot(settings);
    storage.print();
    checks.push(storage);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Sievetube.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Sievetube is ready to use.");
    }

    Ok(())
}

/// Check that an API key is configured, showing it masked.
fn check_key(env: &str, key: Option<String>, required: bool) -> CheckResult {
    let hint = format!("Set with: export {}='...'", env);
    match key {
        Some(key) => CheckResult::ok(env, &format!("configured ({})", mask_key(&key))),
        None if required => CheckResult::error(env, "not set", &hint),
        None => CheckResult::warning(env, "not set (video info disabled)", &hint),
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_url(name: &str, value: &str) -> CheckResult {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "https" => CheckResult::ok(name, value),
        Ok(_) => CheckResult::warning(name, value, "Endpoint is not using HTTPS"),
        Err(e) => CheckResult::error(name, &format!("invalid URL: {}", e), "Fix the URL in the config file"),
    }
}

/// Report where the job cache is persisted.
fn check_snapshot(settings: &Settings) -> CheckResult {
    match settings.snapshot_path() {
        None => CheckResult::ok("Job cache", "in memory only"),
        Some(path) if path.exists() => CheckResult::ok("Job cache", &format!("{}", path.display())),
        Some(path) => CheckResult::warning(
            "Job cache",
            &format!("{} (not created yet)", path.display()),
            "The snapshot is written after the first processed video",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: sievetube config init",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_optional_key_is_warning() {
        assert_eq!(check_key("X", None, false).status, CheckStatus::Warning);
        assert_eq!(check_key("X", None, true).status, CheckStatus::Error);
        assert_eq!(
            check_key("X", Some("gsk_abcdefghijkl".to_string()), true).message,
            "configured (gsk_...ijkl)"
        );
    }

    #[test]
    fn test_mask_short_key() {
        assert_eq!(mask_key("abc"), "****");
    }

    #[test]
    fn test_check_url() {
        assert_eq!(check_url("a", "https://mango.sievedata.com/v2").status, CheckStatus::Ok);
        assert_eq!(check_url("a", "http://localhost:8080").status, CheckStatus::Warning);
        assert_eq!(check_url("a", "not a url").status, CheckStatus::Error);
    }
}
