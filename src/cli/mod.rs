//! CLI module for Sievetube.

pub mod commands;
mod output;
pub mod preflight;
mod snapshot;

pub use output::Output;
pub use snapshot::{load_cache, save_cache};

use clap::{Parser, Subcommand};

/// Sievetube - chat with YouTube videos
///
/// Fetches a video's subtitles through a Sieve job, caches the timestamped
/// transcript, and answers questions about it with an LLM.
#[derive(Parser, Debug)]
#[command(name = "sievetube")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration and API keys
    Doctor,

    /// Fetch and cache the transcript for a video
    Process {
        /// YouTube URL or video ID
        video: String,

        /// Print the job record as JSON
        #[arg(long)]
        json: bool,

        /// Print the full transcript when ready
        #[arg(short, long)]
        transcript: bool,
    },

    /// Ask a question about a video
    Ask {
        /// YouTube URL or video ID
        video: String,

        /// The question to ask
        question: String,

        /// Video title used in the prompt (looked up via the YouTube API if omitted)
        #[arg(long)]
        title: Option<String>,
    },

    /// Check the status of a Sieve job once
    Status {
        /// Sieve job ID
        job_id: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from([
            "sievetube",
            "-vv",
            "ask",
            "https://youtu.be/dQw4w9WgXcQ",
            "What is this about?",
        ]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask {
                video, question, title,
            } => {
                assert_eq!(video, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(question, "What is this about?");
                assert!(title.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["sievetube", "serve", "--port", "8080", "-c", "/tmp/c.toml"]);

        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(
            cli.command,
            Commands::Serve {
                host: None,
                port: Some(8080)
            }
        ));
    }
}
