//! CLI module for Peon.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Peon - a retrieval-augmented chat assistant
///
/// Answers questions from your document knowledge base and keeps a per-user
/// history of every exchange.
#[derive(Parser, Debug)]
#[command(name = "peon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PEON_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration and create the data stores
    Init,

    /// Add text documents to the knowledge base
    Ingest {
        /// A text file, or a directory of .txt/.md files
        path: String,
    },

    /// List documents in the knowledge base
    Sources,

    /// Ask a single question (recorded in history)
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Show chat history (all users for admins, your own otherwise)
    History,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Log level for the given `-v` count. Without `-v` the configured level applies.
pub fn log_level(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from(["peon", "-vv", "ask", "What is covered?"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Ask { ref question } if question == "What is covered?"));

        let cli = Cli::parse_from(["peon", "serve", "--port", "8080", "--config", "/tmp/peon.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/peon.toml"));
        assert!(matches!(cli.command, Commands::Serve { port: 8080, .. }));
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        assert_eq!(log_level(0, "error"), "error");
        assert_eq!(log_level(1, "error"), "info");
        assert_eq!(log_level(2, "error"), "debug");
        assert_eq!(log_level(5, "error"), "trace");
    }
}
