//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that turns text into fixed-length embedding vectors.
///
/// Implementations wrap specific backends (OpenAI, local models, etc.)
/// behind a unified async interface.
///
/// # Ordering contract
///
/// [`embed_batch`](EmbeddingProvider::embed_batch) must return one vector
/// per input, in input order. Backends that return results out of request
/// order must re-sort by request index before returning; the ingestion
/// orchestrator relies on positional correspondence when attaching vectors
/// to chunks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially, which trivially preserves order. Override when the
    /// backend supports native batching.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimensionality of the vectors produced by this provider (e.g. 1536).
    fn dimensions(&self) -> usize;
}
