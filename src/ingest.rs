//! Embedding/indexing orchestrator.
//!
//! The [`Indexer`] turns chunks into vector records: it batches chunk texts
//! through an [`EmbeddingProvider`], pairs the vectors back up with their
//! chunks in order, and upserts the records into a [`VectorIndex`] in
//! index-friendly batches.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::document::{Chunk, VectorMetadata, VectorRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{VectorFilter, VectorIndex};

/// Default number of texts per embedding request.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 100;

/// Default number of records per index upsert call.
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// Identity of the document whose chunks are being ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Persisted document ID.
    pub document_id: String,
    /// Owning user ID.
    pub owner_id: String,
    /// Display name of the source file.
    pub file_name: String,
    /// File type of the source document.
    pub file_type: String,
}

impl DocumentRef {
    /// Create a document reference.
    pub fn new(
        document_id: impl Into<String>,
        owner_id: impl Into<String>,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            owner_id: owner_id.into(),
            file_name: file_name.into(),
            file_type: file_type.into(),
        }
    }
}

/// Orchestrates chunk embedding and vector upserts for one document at a
/// time.
///
/// The indexer assumes at most one ingestion in flight per document; the
/// caller's document-status state machine serializes per-document work.
/// Ingestion of different documents may run concurrently. Any batch failure
/// aborts the whole document's ingestion — partial vector state is never
/// reported as success, and the caller retries the whole document.
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    embed_batch_size: usize,
    upsert_batch_size: usize,
}

impl Indexer {
    /// Create an indexer with the default batch sizes (100/100).
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        }
    }

    /// Override the embedding and upsert batch sizes.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if either size is zero.
    pub fn with_batch_sizes(mut self, embed: usize, upsert: usize) -> Result<Self> {
        if embed == 0 || upsert == 0 {
            return Err(RagError::ConfigError("batch sizes must be greater than zero".to_string()));
        }
        self.embed_batch_size = embed;
        self.upsert_batch_size = upsert;
        Ok(self)
    }

    /// Embed `chunks` and upsert one vector record per chunk.
    ///
    /// Record IDs are `{document_id}_{chunk_index}`, stable across retries,
    /// so a retried ingestion overwrites rather than duplicates.
    ///
    /// Returns the number of records upserted.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestError`] if any embedding or upsert batch
    /// fails. The document's vector state must then be treated as unknown.
    pub async fn upsert_chunks(&self, document: &DocumentRef, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            info!(document_id = %document.document_id, chunk_count = 0, "nothing to ingest");
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for (batch_index, batch) in texts.chunks(self.embed_batch_size).enumerate() {
            debug!(batch_index, batch_size = batch.len(), "embedding chunk batch");
            let vectors = self.embedder.embed_batch(batch).await.map_err(|e| {
                error!(
                    document_id = %document.document_id,
                    error = %e,
                    "embedding failed during ingestion"
                );
                RagError::IngestError(format!(
                    "embedding failed for document '{}': {e}",
                    document.document_id
                ))
            })?;
            if vectors.len() != batch.len() {
                return Err(RagError::IngestError(format!(
                    "embedding provider returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.extend(vectors);
        }

        let created_at = Utc::now();
        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord {
                id: format!("{}_{}", document.document_id, chunk.index),
                values,
                metadata: VectorMetadata {
                    document_id: document.document_id.clone(),
                    owner_id: document.owner_id.clone(),
                    chunk_index: chunk.index,
                    text: chunk.text.clone(),
                    file_name: document.file_name.clone(),
                    file_type: document.file_type.clone(),
                    created_at,
                    extra: chunk.metadata.extra.clone(),
                },
            })
            .collect();

        for (batch_index, batch) in records.chunks(self.upsert_batch_size).enumerate() {
            debug!(batch_index, batch_size = batch.len(), "upserting record batch");
            self.index.upsert(batch).await.map_err(|e| {
                error!(
                    document_id = %document.document_id,
                    error = %e,
                    "upsert failed during ingestion"
                );
                RagError::IngestError(format!(
                    "upsert failed for document '{}': {e}",
                    document.document_id
                ))
            })?;
        }

        info!(
            document_id = %document.document_id,
            chunk_count = records.len(),
            "document vectors upserted"
        );

        Ok(records.len())
    }

    /// Delete all vector records belonging to a document.
    ///
    /// Best-effort: a failure is logged and swallowed so it never blocks
    /// deletion of the owning document record.
    pub async fn delete_document_vectors(&self, document_id: &str) {
        match self.index.delete(&VectorFilter::document(document_id)).await {
            Ok(()) => info!(document_id, "document vectors deleted"),
            Err(e) => warn!(document_id, error = %e, "failed to delete document vectors"),
        }
    }

    /// Delete all vector records belonging to an owner.
    ///
    /// Best-effort, same contract as
    /// [`delete_document_vectors`](Indexer::delete_document_vectors).
    pub async fn delete_owner_vectors(&self, owner_id: &str) {
        match self.index.delete(&VectorFilter::owner(owner_id)).await {
            Ok(()) => info!(owner_id, "owner vectors deleted"),
            Err(e) => warn!(owner_id, error = %e, "failed to delete owner vectors"),
        }
    }
}
