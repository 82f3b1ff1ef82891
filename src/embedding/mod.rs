//! Text embeddings for knowledge base lookup.
//!
//! Questions and document chunks must come from the same model and
//! dimensionality, otherwise their distances mean nothing.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::{PeonError, Result};
use async_trait::async_trait;

/// Turns text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed several texts. Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PeonError::Embedding("Empty embedding response".to_string()))
    }

    /// Length of the vectors this embedder produces.
    fn dimensions(&self) -> usize;
}
