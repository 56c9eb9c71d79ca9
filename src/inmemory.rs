//! In-memory vector index using cosine similarity.
//!
//! [`InMemoryIndex`] is a zero-dependency index backed by a `HashMap`
//! protected by a `tokio::sync::RwLock`. It is suitable for development,
//! tests, and small corpora; production deployments plug a real index in
//! behind the same [`VectorIndex`] trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{ScoredMatch, VectorRecord};
use crate::error::Result;
use crate::index::{VectorFilter, VectorIndex};

/// An in-memory [`VectorIndex`] using cosine similarity for search.
///
/// Records are keyed by their stable IDs, so re-ingesting a document
/// replaces its previous vectors.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the index holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

/// Cosine similarity of two vectors; 0.0 when either has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
        min_score: f32,
    ) -> Result<Vec<ScoredMatch>> {
        let store = self.records.read().await;

        let mut scored: Vec<ScoredMatch> = store
            .values()
            .filter(|record| filter.matches(&record.metadata))
            .map(|record| ScoredMatch {
                id: record.id.clone(),
                score: cosine_similarity(&record.values, embedding),
                metadata: record.metadata.clone(),
            })
            .filter(|m| m.score >= min_score)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, filter: &VectorFilter) -> Result<()> {
        let mut store = self.records.write().await;
        store.retain(|_, record| !filter.matches(&record.metadata));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::document::VectorMetadata;

    fn record(id: &str, owner: &str, document: &str, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            metadata: VectorMetadata {
                document_id: document.to_string(),
                owner_id: owner.to_string(),
                chunk_index: 0,
                text: format!("text of {id}"),
                file_name: "a.txt".to_string(),
                file_type: "txt".to_string(),
                created_at: Utc::now(),
                extra: HashMap::new(),
            },
        }
    }

    #[tokio::test]
    async fn query_scopes_to_owner_and_documents() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("a_0", "u1", "a", vec![1.0, 0.0]),
                record("b_0", "u1", "b", vec![1.0, 0.0]),
                record("c_0", "u2", "c", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let by_owner =
            index.query(&[1.0, 0.0], 10, &VectorFilter::owner("u1"), 0.0).await.unwrap();
        assert_eq!(by_owner.len(), 2);

        let scoped = VectorFilter::owner("u1").with_documents(vec!["b".to_string()]);
        let by_doc = index.query(&[1.0, 0.0], 10, &scoped, 0.0).await.unwrap();
        assert_eq!(by_doc.len(), 1);
        assert_eq!(by_doc[0].id, "b_0");
    }

    #[tokio::test]
    async fn query_applies_min_score_threshold() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("a_0", "u1", "a", vec![1.0, 0.0]),
                record("a_1", "u1", "a", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results =
            index.query(&[1.0, 0.0], 10, &VectorFilter::owner("u1"), 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a_0");
    }

    #[tokio::test]
    async fn delete_by_document_cascades() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("a_0", "u1", "a", vec![1.0, 0.0]),
                record("a_1", "u1", "a", vec![0.5, 0.5]),
                record("b_0", "u1", "b", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        index.delete(&VectorFilter::document("a")).await.unwrap();
        assert_eq!(index.len().await, 1);

        index.delete(&VectorFilter::owner("u1")).await.unwrap();
        assert!(index.is_empty().await);
    }
}
