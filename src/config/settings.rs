//! Configuration settings for Peon.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub completion: CompletionSettings,
    pub knowledge_base: KnowledgeBaseSettings,
    pub history: HistorySettings,
    pub identity: IdentitySettings,
    pub chat: ChatSettings,
    pub presentation: PresentationSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.peon".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Storage backend for the knowledge base and the history table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// SQLite database file (default).
    #[default]
    Sqlite,
    /// Process-local memory; contents are lost on exit.
    Memory,
}

impl std::str::FromStr for StoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreProvider::Sqlite),
            "memory" => Ok(StoreProvider::Memory),
            _ => Err(format!("Unknown store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreProvider::Sqlite => write!(f, "sqlite"),
            StoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Base URL of an OpenAI-compatible API. None uses OpenAI.
    pub api_base: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 768,
            api_base: None,
        }
    }
}

/// Completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on a single completion call, in seconds.
    pub timeout_secs: u64,
    /// Optional OpenAI-compatible API base URL.
    pub api_base: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
            api_base: None,
        }
    }
}

/// Knowledge base settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    /// Storage provider (sqlite, memory).
    pub provider: StoreProvider,
    /// Path to the SQLite database holding document chunks.
    pub sqlite_path: String,
    /// Target chunk size in characters when ingesting documents.
    pub chunk_chars: usize,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Sqlite,
            sqlite_path: "~/.peon/knowledge.db".to_string(),
            chunk_chars: 1200,
        }
    }
}

/// Chat history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Storage provider (sqlite, memory).
    pub provider: StoreProvider,
    /// Path to the SQLite database holding the history table.
    pub sqlite_path: String,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Sqlite,
            sqlite_path: "~/.peon/history.db".to_string(),
        }
    }
}

/// Identity and role settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Environment variable holding the user's display name in the terminal.
    pub user_env: String,
    /// User names that are granted the admin role.
    pub admin_users: Vec<String>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            user_env: "PEON_USER".to_string(),
            admin_users: Vec::new(),
        }
    }
}

/// Chat transcript settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Only render the last N turns of the transcript. None renders everything.
    pub transcript_limit: Option<usize>,
}

/// Branding shown above the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationSettings {
    /// Logo text rendered in the banner.
    pub logo_text: String,
    /// Welcome line shown under the logo.
    pub welcome: String,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            logo_text: "KASMO".to_string(),
            welcome: "Welcome to SnowPeon, Your Virtual Assistant!".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
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
            .map_err(|e| crate::error::PeonError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("peon")
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

    /// Get the expanded knowledge base database path.
    pub fn knowledge_base_path(&self) -> PathBuf {
        Self::expand_path(&self.knowledge_base.sqlite_path)
    }

    /// Get the expanded history database path.
    pub fn history_path(&self) -> PathBuf {
        Self::expand_path(&self.history.sqlite_path)
    }

    /// Completion timeout as a duration.
    pub fn completion_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.completion.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [identity]
            admin_users = ["root"]

            [chat]
            transcript_limit = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.identity.admin_users, vec!["root".to_string()]);
        assert_eq!(settings.identity.user_env, "PEON_USER");
        assert_eq!(settings.chat.transcript_limit, Some(5));
        assert_eq!(settings.history.provider, StoreProvider::Sqlite);
        assert_eq!(settings.completion.timeout_secs, 60);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.history.provider = StoreProvider::Memory;
        settings.completion.model = "llama-3-70b".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.history.provider, StoreProvider::Memory);
        assert_eq!(loaded.completion.model, "llama-3-70b");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.presentation.logo_text, "KASMO");
        assert!(settings.chat.transcript_limit.is_none());
    }

    #[test]
    fn test_store_provider_parse() {
        assert_eq!("SQLite".parse::<StoreProvider>().unwrap(), StoreProvider::Sqlite);
        assert_eq!("memory".parse::<StoreProvider>().unwrap(), StoreProvider::Memory);
        assert!("postgres".parse::<StoreProvider>().is_err());
    }
}
