//! End-to-end pipeline test: chunk, ingest, retrieve, assemble.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use ragcore::chunking::{Chunker, SemanticChunkConfig, SemanticChunker};
use ragcore::document::{ChunkKind, ChunkSource};
use ragcore::embedding::EmbeddingProvider;
use ragcore::error::Result;
use ragcore::ingest::{DocumentRef, Indexer};
use ragcore::inmemory::InMemoryIndex;
use ragcore::prompt::PromptBuilder;
use ragcore::retriever::{DocumentStore, RagQuery, Retriever, confidence};

struct FixedEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

struct SingleDocStore;

#[async_trait]
impl DocumentStore for SingleDocStore {
    async fn find_names_by_ids(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        Ok(ids.iter().map(|id| (id.clone(), "Contract.pdf".to_string())).collect())
    }
}

/// A 125-character sentence ending in a period.
fn sentence(i: usize) -> String {
    let head = format!("Sentence number {i:02} talks about the agreement");
    format!("{head}{}.", "x".repeat(124 - head.len()))
}

/// Ten two-sentence paragraphs, roughly 2.5k characters in total.
fn long_document() -> String {
    (0..10)
        .map(|p| format!("{} {}", sentence(2 * p), sentence(2 * p + 1)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[test]
fn long_document_chunks_with_sentence_overlap() {
    let chunker = SemanticChunker::new(SemanticChunkConfig {
        target_chunk_size: 800,
        min_chunk_size: 400,
        max_chunk_size: 1200,
        overlap_size: 150,
        respect_paragraphs: true,
        respect_sentences: true,
    })
    .unwrap();

    let text = long_document();
    let result = chunker.chunk(&text, &ChunkSource::new("contract.pdf", "pdf"));

    assert_eq!(result.total_chunks, 4);
    assert_eq!(result.total_chars, text.len());
    for chunk in &result.chunks {
        assert!(chunk.text.len() <= 1200);
        assert_eq!(chunk.metadata.kind, ChunkKind::Paragraph);
    }

    // Each successor opens with a whole trailing sentence of its
    // predecessor, never a mid-sentence fragment.
    for pair in result.chunks.windows(2) {
        let last_sentence = pair[0]
            .text
            .rsplit(". ")
            .next()
            .map(|s| s.trim())
            .unwrap_or_default();
        assert!(pair[1].text.starts_with(last_sentence));
    }

    let stats = result.structure.unwrap();
    assert_eq!(stats.paragraphs_detected, 10);
}

#[tokio::test]
async fn chunks_flow_from_ingestion_to_prompt() {
    let chunker = SemanticChunker::new(SemanticChunkConfig {
        target_chunk_size: 800,
        min_chunk_size: 400,
        max_chunk_size: 1200,
        overlap_size: 150,
        respect_paragraphs: true,
        respect_sentences: true,
    })
    .unwrap();
    let result = chunker.chunk(&long_document(), &ChunkSource::new("contract.pdf", "pdf"));

    let embedder = Arc::new(FixedEmbedder);
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());
    let doc = DocumentRef::new("doc-1", "alice", "contract.pdf", "pdf");
    let stored = indexer.upsert_chunks(&doc, &result.chunks).await.unwrap();
    assert_eq!(stored, result.total_chunks);
    assert_eq!(index.len().await, result.total_chunks);

    let retriever = Retriever::builder()
        .embedder(embedder)
        .index(index)
        .documents(Arc::new(SingleDocStore))
        .build()
        .unwrap();
    let context =
        retriever.perform_query(&RagQuery::new("what does the agreement say?", "alice")).await.unwrap();

    assert_eq!(context.relevant_chunks.len(), 4);
    assert!(context.relevant_chunks.iter().all(|c| c.document_name == "Contract.pdf"));
    assert!((confidence(&context.relevant_chunks) - 1.0).abs() < 1e-4);

    let payload = PromptBuilder::new().build_prompt(&context, &[], None);
    assert!(payload.system_prompt.contains("[Document: Contract.pdf"));
    assert_eq!(payload.messages.last().unwrap().content, "what does the agreement say?");
}
