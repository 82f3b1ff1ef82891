//! Pre-flight checks before operations that call the model provider.

use crate::config::Settings;
use crate::error::{PeonError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs embeddings and completions.
    Answer,
    /// Ingestion needs embeddings.
    Ingest,
    /// Reading history needs only the local database.
    History,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let custom_base = |base: &Option<String>| base.as_deref().is_some_and(|b| !b.is_empty());

    match operation {
        Operation::Answer
            if custom_base(&settings.embedding.api_base) && custom_base(&settings.completion.api_base) =>
        {
            Ok(())
        }
        Operation::Ingest if custom_base(&settings.embedding.api_base) => Ok(()),
        Operation::Answer | Operation::Ingest => check_api_key(),
        Operation::History => Ok(()),
    }
}

/// Check that an OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(PeonError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(PeonError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
