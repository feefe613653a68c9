//! Prompt templates for Sievetube.
//!
//! Prompts can be customized by placing a `chat.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub chat: ChatPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for answering questions about a single video.
///
/// `{{title}}` and `{{transcript}}` are filled in per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI that directly states what is in the video titled "{{title}}". For general greetings like "hi" or "hello", respond naturally with a friendly greeting and offer to help answer questions about the video.

For questions about the video content, present the information as objective facts from the video, without attributing statements to any speaker. Support your answers by citing timestamps copied exactly from the transcript, in the same bracket format it uses, for example [01:23] or [01:02:03].

Here's the video transcript:
{{transcript}}

Instead of saying "At [01:23], the speaker explains...", simply state "At [01:23], the topic covers..." or "The video shows at [01:23]...". Timestamps in brackets are turned into clickable links. If something is unclear from the video content, say so honestly. Keep your responses concise and focused on the video content."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let chat_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_has_placeholders() {
        let prompts = Prompts::default();
        assert!(prompts.chat.system.contains("{{title}}"));
        assert!(prompts.chat.system.contains("{{transcript}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut custom = HashMap::new();
        custom.insert("title".to_string(), "from config".to_string());
        custom.insert("tone".to_string(), "friendly".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("title".to_string(), "Rust in 100 Seconds".to_string());

        let result = prompts.render_with_custom("{{title}} ({{tone}})", &vars);
        assert_eq!(result, "Rust in 100 Seconds (friendly)");
    }

    #[test]
    fn test_custom_dir_overrides_chat_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("chat.toml"),
            "system = \"Answer about {{title}} only.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.chat.system, "Answer about {{title}} only.");
    }
}
