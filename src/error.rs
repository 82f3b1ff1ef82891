//! Error types for Peon.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Peon operations.
#[derive(Error, Debug)]
pub enum PeonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Completion service returned an empty answer")]
    EmptyCompletion,

    #[error("Completion service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("History store error: {0}")]
    History(String),

    #[error("Role resolution failed: {0}")]
    Role(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PeonError {
    /// Whether this error came from the retrieval or completion side of a turn
    /// (as opposed to local storage or configuration).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PeonError::Embedding(_)
                | PeonError::Retrieval(_)
                | PeonError::Completion(_)
                | PeonError::EmptyCompletion
                | PeonError::Timeout(_)
                | PeonError::OpenAI(_)
                | PeonError::Http(_)
        )
    }
}

/// Result type alias for Peon operations.
pub type Result<T> = std::result::Result<T, PeonError>;
