//! In-memory knowledge base.
//!
//! Useful for testing and small corpora.

use super::{check_source, closest, Chunk, IndexedSource, KnowledgeBase, Retrieved};
use crate::error::{PeonError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory knowledge base. Chunks keep their insertion order.
#[derive(Default)]
pub struct MemoryKnowledgeBase {
    chunks: RwLock<Vec<Chunk>>,
}

impl MemoryKnowledgeBase {
    /// Create a new, empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> PeonError {
        PeonError::KnowledgeBase(format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl KnowledgeBase for MemoryKnowledgeBase {
    async fn replace_source(&self, source: &str, chunks: &[Chunk]) -> Result<usize> {
        check_source(source, chunks)?;

        let mut store = self.chunks.write().map_err(Self::poisoned)?;
        let initial_len = store.len();
        store.retain(|c| c.source != source);
        let replaced = initial_len - store.len();

        store.extend(chunks.iter().cloned());
        Ok(replaced)
    }

    async fn nearest(&self, query_embedding: &[f32]) -> Result<Option<Retrieved>> {
        let store = self.chunks.read().map_err(Self::poisoned)?;
        Ok(closest(query_embedding, store.iter().cloned()))
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let store = self.chunks.read().map_err(Self::poisoned)?;

        let mut by_source: HashMap<String, IndexedSource> = HashMap::new();
        for chunk in store.iter() {
            let entry = by_source
                .entry(chunk.source.clone())
                .or_insert_with(|| IndexedSource {
                    source: chunk.source.clone(),
                    chunk_count: 0,
                    indexed_at: chunk.indexed_at,
                });
            entry.chunk_count += 1;
            if chunk.indexed_at > entry.indexed_at {
                entry.indexed_at = chunk.indexed_at;
            }
        }

        let mut sources: Vec<IndexedSource> = by_source.into_values().collect();
        sources.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(sources)
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.chunks.read().map_err(Self::poisoned)?.len())
    }
}
