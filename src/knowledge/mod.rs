//! Knowledge base of embedded document chunks.
//!
//! Provides a trait-based interface for the chunk store and the top-1
//! nearest-neighbour lookup used to ground answers.

mod memory;
mod sqlite;

pub use memory::MemoryKnowledgeBase;
pub use sqlite::SqliteKnowledgeBase;

use crate::config::{Settings, StoreProvider};
use crate::error::{PeonError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A pre-segmented passage of source text stored with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Document the chunk was cut from (usually a file name).
    pub source: String,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Order of this chunk within its source.
    pub chunk_order: i32,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(source: String, content: String, embedding: Vec<f32>, chunk_order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            content,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// The closest chunk to a query embedding.
#[derive(Debug, Clone)]
pub struct Retrieved {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Euclidean distance to the query (lower is better).
    pub distance: f32,
}

/// Summary information about an ingested source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source name.
    pub source: String,
    /// Number of stored chunks.
    pub chunk_count: u32,
    /// When the source was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for knowledge base implementations.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Replace every chunk of `source` with `chunks` in one atomic step.
    /// Returns how many chunks were removed. On error the old chunks are kept.
    async fn replace_source(&self, source: &str, chunks: &[Chunk]) -> Result<usize>;

    /// Return the single chunk with the minimum distance to the query, if any.
    async fn nearest(&self, query_embedding: &[f32]) -> Result<Option<Retrieved>>;

    /// List ingested sources.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Reject chunks that do not belong to the source being replaced.
pub(crate) fn check_source(source: &str, chunks: &[Chunk]) -> Result<()> {
    match chunks.iter().find(|c| c.source != source) {
        Some(stray) => Err(PeonError::InvalidInput(format!(
            "Chunk {} belongs to {}, not {}",
            stray.id, stray.source, source
        ))),
        None => Ok(()),
    }
}

/// Open the knowledge base configured in the settings.
pub fn open(settings: &Settings) -> Result<Arc<dyn KnowledgeBase>> {
    Ok(match settings.knowledge_base.provider {
        StoreProvider::Sqlite => Arc::new(SqliteKnowledgeBase::new(&settings.knowledge_base_path())?),
        StoreProvider::Memory => Arc::new(MemoryKnowledgeBase::new()),
    })
}

/// Compute the Euclidean distance between two vectors.
///
/// Vectors of different length are infinitely far apart.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::INFINITY;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Pick the chunk closest to the query. Ties keep the earliest candidate.
pub(crate) fn closest<I>(query_embedding: &[f32], candidates: I) -> Option<Retrieved>
where
    I: IntoIterator<Item = Chunk>,
{
    let mut best: Option<Retrieved> = None;

    for chunk in candidates {
        let distance = euclidean_distance(query_embedding, &chunk.embedding);
        if !distance.is_finite() {
            continue;
        }
        let better = match &best {
            Some(b) => distance < b.distance,
            None => true,
        };
        if better {
            best = Some(Retrieved { chunk, distance });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, embedding: Vec<f32>, order: i32) -> Chunk {
        Chunk::new("policy.txt".to_string(), content.to_string(), embedding, order)
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 0.001);
        assert_eq!(euclidean_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert!(euclidean_distance(&[1.0], &[1.0, 2.0]).is_infinite());
        assert!(euclidean_distance(&[], &[]).is_infinite());
    }

    #[test]
    fn test_closest_picks_minimum_distance() {
        let candidates = vec![
            chunk("far", vec![10.0, 10.0], 0),
            chunk("near", vec![1.0, 1.1], 1),
            chunk("middle", vec![2.0, 2.0], 2),
        ];

        let best = closest(&[1.0, 1.0], candidates).unwrap();
        assert_eq!(best.chunk.content, "near");
        assert!((best.distance - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_closest_tie_keeps_first() {
        let candidates = vec![chunk("a", vec![1.0, 0.0], 0), chunk("b", vec![-1.0, 0.0], 1)];
        let best = closest(&[0.0, 0.0], candidates).unwrap();
        assert_eq!(best.chunk.content, "a");
    }

    #[test]
    fn test_closest_skips_mismatched_dimensions() {
        let candidates = vec![chunk("wrong", vec![0.0], 0)];
        assert!(closest(&[0.0, 0.0], candidates).is_none());
        assert!(closest(&[0.0, 0.0], Vec::new()).is_none());
    }
}
