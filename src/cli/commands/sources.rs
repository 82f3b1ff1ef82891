//! Sources command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::knowledge;
use anyhow::Result;

/// List the documents in the knowledge base.
pub async fn run_sources(settings: &Settings) -> Result<()> {
    let knowledge_base = knowledge::open(settings)?;
    let sources = knowledge_base.list_sources().await?;

    if sources.is_empty() {
        Output::info("The knowledge base is empty. Use 'peon ingest <path>' to add documents.");
        return Ok(());
    }

    Output::header(&format!("Knowledge Base ({} documents)", sources.len()));
    println!();
    for source in &sources {
        Output::list_item(&format!(
            "{} ({} chunks, indexed {})",
            source.source,
            source.chunk_count,
            source.indexed_at.format("%Y-%m-%d %H:%M")
        ));
    }

    let total: u32 = sources.iter().map(|s| s.chunk_count).sum();
    println!();
    Output::kv("Total chunks", &total.to_string());
    Ok(())
}
