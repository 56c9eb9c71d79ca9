//! RAG query engine.
//!
//! The [`Retriever`] embeds a query, searches the vector index under an
//! owner/document scope, joins matches with document display names, and
//! renders a bounded textual context for the downstream completion step.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::RetrieverConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{VectorFilter, VectorIndex};

/// Display name used when a candidate's document cannot be resolved.
pub const UNKNOWN_DOCUMENT: &str = "Unknown";

/// Delimiter between rendered context blocks.
const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Lookup of document display names, backed by the application's document
/// store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resolve document IDs to display names.
    ///
    /// IDs without a match are simply absent from the returned map.
    async fn find_names_by_ids(&self, ids: &[String]) -> Result<HashMap<String, String>>;

    /// Whether every listed document exists and is visible to `owner_id`.
    ///
    /// The default implementation checks that every ID resolves to a name;
    /// stores that track ownership should override it.
    async fn validate_document_access(&self, _owner_id: &str, ids: &[String]) -> Result<bool> {
        let names = self.find_names_by_ids(ids).await?;
        Ok(ids.iter().all(|id| names.contains_key(id)))
    }
}

/// A retrieval request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagQuery {
    /// The user's question.
    pub query: String,
    /// Owner whose documents are searched.
    pub owner_id: String,
    /// Restrict the search to these documents, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<String>>,
    /// Per-query override of the configured `top_k`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Per-query override of the configured `min_score`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

impl RagQuery {
    /// Create a query scoped to all of `owner_id`'s documents.
    pub fn new(query: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            owner_id: owner_id.into(),
            document_ids: None,
            top_k: None,
            min_score: None,
        }
    }

    /// Restrict the search to the given documents.
    pub fn with_documents(mut self, document_ids: Vec<String>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }

    /// Override the number of chunks to retain.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Override the minimum similarity score.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// A retained chunk joined with its document's display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedChunk {
    /// ID of the owning document.
    pub document_id: String,
    /// Display name of the owning document, or [`UNKNOWN_DOCUMENT`].
    pub document_name: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// The chunk text.
    pub content: String,
    /// Similarity score in `[0, 1]`.
    pub score: f32,
    /// Page number passthrough, when the ingestion recorded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Section label passthrough, when the ingestion recorded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// The result of a retrieval: ranked chunks plus the rendered context.
///
/// Constructed fresh per query and not persisted; only derived usage
/// metadata is stored externally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagContext {
    /// The original query text.
    pub query: String,
    /// Retained chunks, sorted descending by score, at most `top_k` long.
    pub relevant_chunks: Vec<RankedChunk>,
    /// Number of candidates the index returned before truncation.
    pub total_candidates: usize,
    /// Labeled context blocks for prompt embedding; empty when no chunk
    /// was retained. Formatting is stable so downstream prompts are
    /// reproducible.
    pub context_text: String,
}

impl RagContext {
    /// An empty context for a query with no relevant matches.
    fn empty(query: String) -> Self {
        Self { query, relevant_chunks: Vec::new(), total_candidates: 0, context_text: String::new() }
    }
}

/// Confidence heuristic over retained chunks.
///
/// Zero chunks floor at `0.2`; otherwise the average score plus a count
/// bonus capped at `0.2`, clamped to `[0, 1]`. More retrieved chunks
/// modestly boost confidence. Consumed by higher-level agents such as
/// draft generation.
pub fn confidence(chunks: &[RankedChunk]) -> f32 {
    if chunks.is_empty() {
        return 0.2;
    }
    let avg_score = chunks.iter().map(|c| c.score).sum::<f32>() / chunks.len() as f32;
    let count_boost = (chunks.len() as f32 / 5.0).min(0.2);
    (avg_score + count_boost).min(1.0)
}

/// The RAG query engine.
///
/// Stateless per call: each query is a pure function of its input plus
/// external service calls, so concurrent queries need no locking.
/// Construct one via [`Retriever::builder()`].
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    documents: Arc<dyn DocumentStore>,
    config: RetrieverConfig,
}

impl Retriever {
    /// Create a new [`RetrieverBuilder`].
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Execute a retrieval query and build the ranked, deduplicated,
    /// rendered context.
    ///
    /// Zero matches is a valid, common outcome and yields an empty context,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] if query embedding or the index
    /// query fails. A document-name resolution failure does not abort the
    /// query; affected chunks fall back to [`UNKNOWN_DOCUMENT`].
    pub async fn perform_query(&self, input: &RagQuery) -> Result<RagContext> {
        let top_k = input.top_k.unwrap_or(self.config.top_k);
        let min_score = input.min_score.unwrap_or(self.config.min_score);

        info!(
            owner_id = %input.owner_id,
            top_k,
            min_score,
            scoped_documents = input.document_ids.as_ref().map_or(0, Vec::len),
            "performing RAG query"
        );

        let mut filter = VectorFilter::owner(&input.owner_id);
        if let Some(ids) = &input.document_ids {
            if !ids.is_empty() {
                filter = filter.with_documents(ids.clone());
            }
        }

        let embedding = self.embedder.embed(&input.query).await.map_err(|e| {
            error!(error = %e, "query embedding failed");
            RagError::RetrievalError(format!("query embedding failed: {e}"))
        })?;

        let mut candidates = self
            .index
            .query(&embedding, top_k * self.config.overfetch_factor, &filter, min_score)
            .await
            .map_err(|e| {
                error!(error = %e, "vector index query failed");
                RagError::RetrievalError(format!("vector index query failed: {e}"))
            })?;

        let total_candidates = candidates.len();
        if candidates.is_empty() {
            warn!(owner_id = %input.owner_id, "no relevant chunks found for query");
            return Ok(RagContext::empty(input.query.clone()));
        }

        // External indexes usually return matches pre-sorted, but the trait
        // does not require it.
        candidates
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut document_ids: Vec<String> = Vec::new();
        for candidate in candidates.iter().take(top_k) {
            if !document_ids.contains(&candidate.metadata.document_id) {
                document_ids.push(candidate.metadata.document_id.clone());
            }
        }

        let names = match self.documents.find_names_by_ids(&document_ids).await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "document name resolution failed, using placeholders");
                HashMap::new()
            }
        };

        let relevant_chunks: Vec<RankedChunk> = candidates
            .into_iter()
            .take(top_k)
            .map(|m| RankedChunk {
                document_name: names
                    .get(&m.metadata.document_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_DOCUMENT.to_string()),
                page_number: m.metadata.extra.get("page_number").and_then(|v| v.parse().ok()),
                section: m.metadata.extra.get("section").cloned(),
                document_id: m.metadata.document_id,
                chunk_index: m.metadata.chunk_index,
                content: m.metadata.text,
                score: m.score,
            })
            .collect();

        let context_text = render_context(&relevant_chunks);

        info!(
            relevant_chunks = relevant_chunks.len(),
            total_candidates,
            context_len = context_text.len(),
            "RAG context built"
        );

        Ok(RagContext { query: input.query.clone(), relevant_chunks, total_candidates, context_text })
    }
}

/// Render retained chunks as labeled context blocks.
///
/// Block format: `[Document: {name}, Chunk {n}, Relevance: {p}%]` followed
/// by the chunk text, blocks separated by `---`. Chunk positions are
/// 1-based for display.
fn render_context(chunks: &[RankedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "[Document: {}, Chunk {}, Relevance: {:.1}%]\n{}",
                chunk.document_name,
                chunk.chunk_index + 1,
                chunk.score * 100.0,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Builder for constructing a [`Retriever`].
#[derive(Default)]
pub struct RetrieverBuilder {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    documents: Option<Arc<dyn DocumentStore>>,
    config: Option<RetrieverConfig>,
}

impl RetrieverBuilder {
    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector index.
    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the document-name store.
    pub fn documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Set the retriever configuration; defaults are used when omitted.
    pub fn config(mut self, config: RetrieverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the [`Retriever`], validating that all collaborators are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required collaborator is
    /// missing.
    pub fn build(self) -> Result<Retriever> {
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::ConfigError("embedder is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;
        let documents = self
            .documents
            .ok_or_else(|| RagError::ConfigError("documents store is required".to_string()))?;

        Ok(Retriever { embedder, index, documents, config: self.config.unwrap_or_default() })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    /// Name store backed by a fixed map.
    struct MapStore(HashMap<String, String>);

    #[async_trait]
    impl DocumentStore for MapStore {
        async fn find_names_by_ids(&self, ids: &[String]) -> Result<HashMap<String, String>> {
            Ok(ids
                .iter()
                .filter_map(|id| self.0.get(id).map(|name| (id.clone(), name.clone())))
                .collect())
        }
    }

    fn ranked(score: f32) -> RankedChunk {
        RankedChunk {
            document_id: "d".to_string(),
            document_name: "doc".to_string(),
            chunk_index: 0,
            content: "text".to_string(),
            score,
            page_number: None,
            section: None,
        }
    }

    #[test]
    fn confidence_floors_at_point_two_for_no_chunks() {
        assert_eq!(confidence(&[]), 0.2);
    }

    #[test]
    fn confidence_combines_average_and_count_boost() {
        // avg 0.8, boost min(3/5, 0.2) = 0.2, clamped to 1.0.
        let chunks = vec![ranked(0.9), ranked(0.8), ranked(0.7)];
        assert!((confidence(&chunks) - 1.0).abs() < 1e-6);

        // avg 0.6, boost min(1/5, 0.2) = 0.2.
        let chunks = vec![ranked(0.6)];
        assert!((confidence(&chunks) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn context_blocks_use_stable_format() {
        let mut chunk = ranked(0.856);
        chunk.chunk_index = 2;
        let rendered = render_context(&[chunk]);
        assert_eq!(rendered, "[Document: doc, Chunk 3, Relevance: 85.6%]\ntext");
    }

    #[test]
    fn builder_requires_collaborators() {
        assert!(matches!(Retriever::builder().build(), Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn access_validation_requires_every_id_to_resolve() {
        let store = MapStore(
            [("contract".to_string(), "Contract.pdf".to_string())].into_iter().collect(),
        );

        let ids = vec!["contract".to_string()];
        assert!(store.validate_document_access("alice", &ids).await.unwrap());

        let ids = vec!["contract".to_string(), "ghost".to_string()];
        assert!(!store.validate_document_access("alice", &ids).await.unwrap());
    }
}
