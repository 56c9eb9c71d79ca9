//! Vector index trait and metadata filters.

use async_trait::async_trait;

use crate::document::{ScoredMatch, VectorRecord};
use crate::error::Result;

/// A metadata filter scoping index operations to an owner and, optionally,
/// a set of documents.
///
/// Both constraints apply together: a record matches only if its owner
/// matches *and* (when document IDs are given) its document is listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorFilter {
    /// Restrict to records owned by this user.
    pub owner_id: Option<String>,
    /// Restrict to records from these documents.
    pub document_ids: Option<Vec<String>>,
}

impl VectorFilter {
    /// Filter matching everything owned by `owner_id`.
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self { owner_id: Some(owner_id.into()), document_ids: None }
    }

    /// Filter matching everything belonging to `document_id`.
    pub fn document(document_id: impl Into<String>) -> Self {
        Self { owner_id: None, document_ids: Some(vec![document_id.into()]) }
    }

    /// Additionally restrict to the given documents.
    pub fn with_documents(mut self, document_ids: Vec<String>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }

    /// Whether a record's metadata satisfies this filter.
    pub fn matches(&self, metadata: &crate::document::VectorMetadata) -> bool {
        if self.owner_id.as_deref().is_some_and(|owner| metadata.owner_id != owner) {
            return false;
        }
        if self.document_ids.as_ref().is_some_and(|ids| !ids.contains(&metadata.document_id)) {
            return false;
        }
        true
    }
}

/// A similarity-search backend for chunk embeddings.
///
/// Implementations persist [`VectorRecord`]s and support filtered
/// nearest-neighbor queries. The index is treated as an external
/// collaborator: provider errors propagate to the caller, which owns the
/// retry policy.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by ID.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Return up to `top_k` records most similar to `embedding`, restricted
    /// to records matching `filter` and scoring at least `min_score`.
    ///
    /// Results are ordered by descending similarity score.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
        min_score: f32,
    ) -> Result<Vec<ScoredMatch>>;

    /// Delete all records matching `filter`.
    async fn delete(&self, filter: &VectorFilter) -> Result<()>;
}
