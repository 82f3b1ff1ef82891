//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::ingest::ingest_path;
use crate::knowledge;
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(path: &str, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let knowledge_base = knowledge::open(settings)?;
    let embedder = OpenAIEmbedder::from_settings(&settings.embedding)?;
    let path = Settings::expand_path(path);

    let spinner = Output::spinner(&format!("Indexing {}...", path.display()));
    let result = ingest_path(
        knowledge_base.as_ref(),
        &embedder,
        Path::new(&path),
        settings.knowledge_base.chunk_chars,
    )
    .await;
    spinner.finish_and_clear();

    match result {
        Ok(reports) if reports.is_empty() => {
            Output::warning("No .txt or .md files found.");
        }
        Ok(reports) => {
            for report in &reports {
                let replaced = if report.chunks_replaced > 0 {
                    format!(" (replaced {})", report.chunks_replaced)
                } else {
                    String::new()
                };
                Output::success(&format!(
                    "{}: {} chunks{}",
                    report.source, report.chunks_indexed, replaced
                ));
            }
            Output::kv("Total chunks", &knowledge_base.chunk_count().await?.to_string());
        }
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
