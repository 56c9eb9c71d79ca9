//! Document chunking and retrieval-context assembly for RAG pipelines.
//!
//! This crate provides:
//! - Sentence and structure analysis for plain text
//! - Fixed-size and structure-aware chunking strategies
//! - Batch embedding and vector upsert orchestration
//! - Filtered similarity retrieval with rendered context text
//! - Prompt assembly with conversation history and domain hints
//!
//! The seams are traits: [`EmbeddingProvider`] for embedding backends,
//! [`VectorIndex`] for vector storage, [`DocumentStore`] for document name
//! resolution, and [`Chunker`] plus [`BoundaryDetector`] for text
//! segmentation. An [`InMemoryIndex`] ships for tests and small corpora;
//! an OpenAI embedding provider is available behind the `openai` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragcore::{
//!     ChunkSource, ChunkStrategy, DocumentRef, Indexer, InMemoryIndex,
//!     RagQuery, Retriever, SemanticChunkConfig,
//! };
//!
//! let chunker = ChunkStrategy::Semantic(SemanticChunkConfig::default()).build()?;
//! let result = chunker.chunk(&text, &ChunkSource::new("report.pdf", "pdf"));
//!
//! let index = Arc::new(InMemoryIndex::new());
//! let indexer = Indexer::new(embedder.clone(), index.clone());
//! indexer.upsert_chunks(&DocumentRef::new("doc-1", "user-1", "report.pdf", "pdf"), &result.chunks).await?;
//!
//! let retriever = Retriever::builder()
//!     .embedder(embedder)
//!     .index(index)
//!     .documents(store)
//!     .build()?;
//! let context = retriever.perform_query(&RagQuery::new("payment terms", "user-1")).await?;
//! ```

pub mod analyzer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod inmemory;
pub mod prompt;
pub mod retriever;

#[cfg(feature = "openai")]
pub mod openai;

pub use analyzer::{BoundaryDetector, DocumentStructure, Heading, HeuristicDetector, Paragraph};
pub use chunking::{
    ChunkStrategy, Chunker, FixedChunkConfig, SemanticChunkConfig, SemanticChunker,
    SentenceChunker,
};
pub use config::{RetrieverConfig, RetrieverConfigBuilder};
pub use document::{
    Chunk, ChunkKind, ChunkMetadata, ChunkResult, ChunkSource, ScoredMatch, StructureStats,
    VectorMetadata, VectorRecord,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{VectorFilter, VectorIndex};
pub use ingest::{DocumentRef, Indexer};
pub use inmemory::InMemoryIndex;
pub use prompt::{
    ChatMessage, PromptBuilder, PromptDomain, PromptPayload, RetrievalUsage, Role,
    detect_domain, estimate_tokens,
};
pub use retriever::{
    DocumentStore, RagContext, RagQuery, RankedChunk, Retriever, RetrieverBuilder, confidence,
};

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
