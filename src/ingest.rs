//! Knowledge base ingestion.
//!
//! Splits plain-text documents into paragraph-aligned chunks, embeds them and
//! stores them in the knowledge base. Re-ingesting a source replaces its chunks.

use crate::embedding::Embedder;
use crate::error::{PeonError, Result};
use crate::knowledge::{Chunk, KnowledgeBase};
use std::path::Path;
use tracing::{info, instrument};

/// Result of ingesting one document.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub source: String,
    pub chunks_indexed: usize,
    pub chunks_replaced: usize,
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) are packed together until the limit
/// is reached. A paragraph longer than the limit is cut on word boundaries,
/// and a single word longer than the limit becomes its own chunk.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    let paragraphs = text
        .split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty());

    for paragraph in paragraphs {
        let separator = if current.is_empty() { 0 } else { 2 };
        if char_len(&current) + separator + char_len(&paragraph) <= max_chars {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&paragraph);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if char_len(&paragraph) <= max_chars {
            current = paragraph;
            continue;
        }

        for word in paragraph.split(' ') {
            let separator = if current.is_empty() { 0 } else { 1 };
            if char_len(&current) + separator + char_len(word) > max_chars && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Chunk, embed and store one document.
#[instrument(skip(knowledge_base, embedder, text), fields(source = %source))]
pub async fn ingest_text(
    knowledge_base: &dyn KnowledgeBase,
    embedder: &dyn Embedder,
    source: &str,
    text: &str,
    max_chars: usize,
) -> Result<IngestReport> {
    let pieces = split_into_chunks(text, max_chars);
    if pieces.is_empty() {
        return Err(PeonError::InvalidInput(format!("{} contains no text", source)));
    }

    let embeddings = embedder.embed_batch(&pieces).await?;
    if embeddings.len() != pieces.len() {
        return Err(PeonError::Embedding(format!(
            "Expected {} embeddings, got {}",
            pieces.len(),
            embeddings.len()
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != embedder.dimensions()) {
        return Err(PeonError::Embedding(format!(
            "Expected {}-dimensional embeddings, got {}",
            embedder.dimensions(),
            bad.len()
        )));
    }

    let chunks: Vec<Chunk> = pieces
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (content, embedding))| Chunk::new(source.to_string(), content, embedding, i as i32))
        .collect();

    let chunks_replaced = knowledge_base.replace_source(source, &chunks).await?;
    let chunks_indexed = chunks.len();

    info!("Indexed {} chunks from {}", chunks_indexed, source);

    Ok(IngestReport {
        source: source.to_string(),
        chunks_indexed,
        chunks_replaced,
    })
}

/// Ingest a text file, or every `.txt`/`.md` file directly inside a directory.
pub async fn ingest_path(
    knowledge_base: &dyn KnowledgeBase,
    embedder: &dyn Embedder,
    path: &Path,
    max_chars: usize,
) -> Result<Vec<IngestReport>> {
    let mut files = Vec::new();

    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry_path = entry?.path();
            let is_text = entry_path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e.to_lowercase().as_str(), "txt" | "md"));
            if entry_path.is_file() && is_text {
                files.push(entry_path);
            }
        }
        files.sort();
    } else if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        return Err(PeonError::InvalidInput(format!("{} does not exist", path.display())));
    }

    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let text = std::fs::read_to_string(&file)?;
        let source = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        reports.push(ingest_text(knowledge_base, embedder, &source, &text, max_chars).await?);
    }

    Ok(reports)
}
