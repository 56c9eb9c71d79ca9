//! Data types for chunks, vector records, and search matches.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The structural role of a chunk within its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Built from one or more whole paragraphs.
    Paragraph,
    /// Built from a heading-delimited section.
    Section,
    /// Built from text that crossed structural boundaries.
    Mixed,
}

/// Source-document context handed to a [`Chunker`](crate::Chunker).
///
/// Every produced chunk inherits these fields in its [`ChunkMetadata`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Display name of the source file.
    pub file_name: String,
    /// File type of the source (e.g. `pdf`, `docx`, `txt`).
    pub file_type: String,
    /// Page number, when the extractor tracked one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Section label, when the extractor tracked one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl ChunkSource {
    /// Create a source descriptor from a file name and type.
    pub fn new(file_name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: file_type.into(),
            page_number: None,
            section: None,
        }
    }
}

/// Typed metadata attached to every [`Chunk`].
///
/// Closed fields cover everything the retriever needs; provider-specific
/// passthrough values go in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Display name of the source file.
    pub source_file_name: String,
    /// File type of the source document.
    pub source_file_type: String,
    /// The most recent heading preceding this chunk, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_text: Option<String>,
    /// Page number within the source, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Section label within the source, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Structural role of the chunk.
    pub kind: ChunkKind,
    /// Number of whitespace-separated words in the chunk text.
    pub word_count: usize,
    /// Number of sentences accumulated into the chunk.
    pub sentence_count: usize,
    /// Open extension map for provider-specific passthrough fields.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

impl ChunkMetadata {
    /// Build metadata for a chunk of `source` with the given structural kind.
    pub fn for_source(source: &ChunkSource, kind: ChunkKind) -> Self {
        Self {
            source_file_name: source.file_name.clone(),
            source_file_type: source.file_type.clone(),
            heading_text: None,
            page_number: source.page_number,
            section: source.section.clone(),
            kind,
            word_count: 0,
            sentence_count: 0,
            extra: HashMap::new(),
        }
    }
}

/// A contiguous, bounded span of a document's text — the unit of embedding
/// and retrieval.
///
/// Chunks are immutable once produced: re-processing a document replaces all
/// of its chunks and vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The chunk text, non-empty and trimmed.
    pub text: String,
    /// 0-based position within the document, strictly increasing.
    pub index: usize,
    /// Offset of the chunk start in the source text.
    ///
    /// Offsets are tracked cumulatively as overlap is re-consumed; they are
    /// monotonically non-decreasing and consistent with chunk ordering.
    pub start_char: usize,
    /// Offset one past the chunk end; always greater than `start_char`.
    pub end_char: usize,
    /// Typed metadata inherited from the source plus chunk-specific fields.
    pub metadata: ChunkMetadata,
}

/// Structure counts reported by the semantic chunking strategy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructureStats {
    /// Number of paragraphs detected in the source text.
    pub paragraphs_detected: usize,
    /// Number of heading candidates detected in the source text.
    pub headings_detected: usize,
}

/// The output of a [`Chunker`](crate::Chunker) run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkResult {
    /// The produced chunks, in document order.
    pub chunks: Vec<Chunk>,
    /// Number of chunks produced.
    pub total_chunks: usize,
    /// Length of the source text in characters.
    pub total_chars: usize,
    /// Mean chunk text length, 0 when no chunks were produced.
    pub avg_chunk_size: usize,
    /// Structure counts; populated by the semantic strategy only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureStats>,
}

impl ChunkResult {
    /// Assemble a result from produced chunks and the source length.
    pub(crate) fn from_chunks(
        chunks: Vec<Chunk>,
        total_chars: usize,
        structure: Option<StructureStats>,
    ) -> Self {
        let total_chunks = chunks.len();
        let avg_chunk_size = if total_chunks == 0 {
            0
        } else {
            chunks.iter().map(|c| c.text.len()).sum::<usize>() / total_chunks
        };
        Self { chunks, total_chunks, total_chars, avg_chunk_size, structure }
    }
}

/// Metadata persisted alongside every vector record.
///
/// Sufficient to reconstruct which document, owner, and chunk the vector
/// came from without consulting any other store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorMetadata {
    /// ID of the owning document.
    pub document_id: String,
    /// ID of the owning user.
    pub owner_id: String,
    /// Position of the source chunk within its document.
    pub chunk_index: usize,
    /// The chunk text, stored for context rendering at query time.
    pub text: String,
    /// Display name of the source file.
    pub file_name: String,
    /// File type of the source document.
    pub file_type: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Open extension map for provider-specific passthrough fields.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

/// A chunk embedding persisted in a vector index.
///
/// One record exists per chunk; its `id` is derived from the owning chunk's
/// identity and is stable across retries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Stable record ID, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The embedding vector; fixed dimensionality per provider model.
    pub values: Vec<f32>,
    /// Ownership and provenance metadata.
    pub metadata: VectorMetadata,
}

/// A match returned from a vector index query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    /// ID of the matched vector record.
    pub id: String,
    /// Similarity score in `[0, 1]`, higher is more relevant.
    pub score: f32,
    /// Metadata of the matched record.
    pub metadata: VectorMetadata,
}
