//! Init command - first-run setup.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Settings, StoreProvider};
use crate::{history, knowledge};
use std::path::PathBuf;

/// Write a default config if none exists and create the data stores.
pub async fn run_init(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("Peon Setup");
    println!();

    let config_path = config_path.cloned().unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        Output::info(&format!("Using existing config at {}", config_path.display()));
    } else {
        settings.save_to(&config_path)?;
        Output::success(&format!("Wrote default config to {}", config_path.display()));
    }

    let data_dir = settings.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    Output::kv("Data directory", &data_dir.display().to_string());

    let knowledge_base = knowledge::open(settings)?;
    let chunks = knowledge_base.chunk_count().await?;
    if settings.knowledge_base.provider == StoreProvider::Sqlite {
        Output::kv("Knowledge base", &settings.knowledge_base_path().display().to_string());
    }
    Output::kv("Indexed chunks", &chunks.to_string());

    let history = history::open(settings).await?;
    if settings.history.provider == StoreProvider::Sqlite {
        Output::kv("History", &settings.history_path().display().to_string());
    }
    Output::kv("History records", &history.count().await?.to_string());

    println!();
    if preflight::check(Operation::Answer, settings).is_err() {
        Output::warning("OPENAI_API_KEY is not set. Export it before asking questions.");
    }
    if chunks == 0 {
        Output::info("Add documents with 'peon ingest <path>', then run 'peon chat'.");
    } else {
        Output::success("Ready. Run 'peon chat' to start.");
    }

    Ok(())
}
