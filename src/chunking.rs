//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations behind
//! the explicit [`ChunkStrategy`] selector:
//!
//! - [`SentenceChunker`] — greedy sentence packing into fixed-size chunks
//!   with a character-suffix overlap
//! - [`SemanticChunker`] — structure-aware packing of whole paragraphs with
//!   heading context and sentence-aligned overlap, preferred for production
//!   ingestion

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analyzer::{BoundaryDetector, HeuristicDetector};
use crate::document::{Chunk, ChunkKind, ChunkMetadata, ChunkResult, ChunkSource, StructureStats};
use crate::error::{RagError, Result};

/// A strategy for splitting raw text into retrievable chunks.
///
/// Chunking is a pure function of its inputs: identical text and source
/// yield identical output. Empty or whitespace-only text yields an empty
/// result, not an error.
pub trait Chunker: Send + Sync {
    /// Split `text` into an ordered sequence of overlapping chunks.
    fn chunk(&self, text: &str, source: &ChunkSource) -> ChunkResult;
}

/// Configuration for [`SentenceChunker`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixedChunkConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Trailing characters of a closed chunk re-used to seed the next one.
    pub chunk_overlap: usize,
    /// Chunks below this length are merged into their predecessor.
    pub min_chunk_size: usize,
}

impl Default for FixedChunkConfig {
    fn default() -> Self {
        Self { chunk_size: 800, chunk_overlap: 150, min_chunk_size: 100 }
    }
}

/// Configuration for [`SemanticChunker`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SemanticChunkConfig {
    /// Preferred chunk length in characters; packing stops growing a chunk
    /// past this point once it has reached `min_chunk_size`.
    pub target_chunk_size: usize,
    /// Chunks below this length are merged into their predecessor.
    pub min_chunk_size: usize,
    /// Hard upper bound; a buffer is closed before exceeding it.
    pub max_chunk_size: usize,
    /// Approximate overlap carried between consecutive chunks. The actual
    /// overlap is whole sentences accumulated up to 1.5x this size.
    pub overlap_size: usize,
    /// Keep paragraphs intact as the unit of accumulation.
    pub respect_paragraphs: bool,
    /// Align overlap on sentence boundaries.
    pub respect_sentences: bool,
}

impl Default for SemanticChunkConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: 800,
            min_chunk_size: 200,
            max_chunk_size: 1200,
            overlap_size: 150,
            respect_paragraphs: true,
            respect_sentences: true,
        }
    }
}

/// Explicit chunking-strategy selector.
///
/// Callers choose the strategy; the crate never guesses. The fixed strategy
/// is the cheap baseline, the semantic strategy produces self-contained
/// chunks with heading context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ChunkStrategy {
    /// Fixed-size sentence packing ([`SentenceChunker`]).
    Fixed(FixedChunkConfig),
    /// Structure-aware semantic chunking ([`SemanticChunker`]).
    Semantic(SemanticChunkConfig),
}

impl ChunkStrategy {
    /// Build the selected chunker with the default [`HeuristicDetector`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the configuration is invalid.
    pub fn build(self) -> Result<Box<dyn Chunker>> {
        self.build_with_detector(Arc::new(HeuristicDetector::new()))
    }

    /// Build the selected chunker with a custom boundary detector.
    pub fn build_with_detector(self, detector: Arc<dyn BoundaryDetector>) -> Result<Box<dyn Chunker>> {
        match self {
            Self::Fixed(config) => {
                Ok(Box::new(SentenceChunker::new(config)?.with_detector(detector)))
            }
            Self::Semantic(config) => {
                Ok(Box::new(SemanticChunker::new(config)?.with_detector(detector)))
            }
        }
    }
}

/// Packs sentences greedily into chunks of roughly `chunk_size` characters.
///
/// When appending the next sentence would overflow `chunk_size` and the
/// buffer has reached `min_chunk_size`, the buffer is closed and the next
/// one is seeded with its trailing `chunk_overlap` characters. A trailing
/// buffer below `min_chunk_size` is merged into the previous chunk, so the
/// final chunk may exceed `chunk_size` by up to `min_chunk_size`.
pub struct SentenceChunker {
    config: FixedChunkConfig,
    detector: Arc<dyn BoundaryDetector>,
}

impl SentenceChunker {
    /// Create a chunker, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero, if
    /// `chunk_overlap >= chunk_size`, or if `min_chunk_size > chunk_size`.
    pub fn new(config: FixedChunkConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.min_chunk_size > config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "min_chunk_size ({}) must not exceed chunk_size ({})",
                config.min_chunk_size, config.chunk_size
            )));
        }
        Ok(Self { config, detector: Arc::new(HeuristicDetector::new()) })
    }

    /// Replace the boundary detector.
    pub fn with_detector(mut self, detector: Arc<dyn BoundaryDetector>) -> Self {
        self.detector = detector;
        self
    }

    fn make_chunk(&self, text: &str, index: usize, start: usize, end: usize, sentences: usize, source: &ChunkSource) -> Chunk {
        let mut metadata = ChunkMetadata::for_source(source, ChunkKind::Mixed);
        metadata.word_count = text.split_whitespace().count();
        metadata.sentence_count = sentences;
        Chunk { text: text.to_string(), index, start_char: start, end_char: end, metadata }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str, source: &ChunkSource) -> ChunkResult {
        let FixedChunkConfig { chunk_size, chunk_overlap, min_chunk_size } = self.config;

        debug!(text_len = text.len(), chunk_size, chunk_overlap, "chunking text");

        if text.trim().is_empty() {
            return ChunkResult::from_chunks(Vec::new(), 0, None);
        }

        if text.len() <= chunk_size {
            let trimmed = text.trim();
            let sentences = self.detector.split_sentences(trimmed).len();
            let chunk = self.make_chunk(trimmed, 0, 0, text.len(), sentences, source);
            return ChunkResult::from_chunks(vec![chunk], text.len(), None);
        }

        let sentences = self.detector.split_sentences(text);
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();
        let mut current_start = 0;
        let mut chunk_index = 0;
        let mut sentences_in_chunk = 0;

        for sentence in &sentences {
            let potential_len = if current.is_empty() {
                sentence.len()
            } else {
                current.len() + 1 + sentence.len()
            };

            if !current.is_empty() && potential_len > chunk_size && current.len() >= min_chunk_size
            {
                let end = current_start + current.len();
                chunks.push(self.make_chunk(
                    current.trim(),
                    chunk_index,
                    current_start,
                    end,
                    sentences_in_chunk,
                    source,
                ));
                chunk_index += 1;

                // Seed the next buffer with the trailing overlap of this one.
                let overlap_start =
                    ceil_char_boundary(&current, current.len().saturating_sub(chunk_overlap));
                let overlap = current[overlap_start..].to_string();
                current_start += overlap_start;
                current = format!("{overlap} {sentence}");
                sentences_in_chunk = 1;
            } else if current.is_empty() {
                current = sentence.clone();
                sentences_in_chunk = 1;
            } else {
                current.push(' ');
                current.push_str(sentence);
                sentences_in_chunk += 1;
            }
        }

        finish_buffer(&mut chunks, &current, min_chunk_size, " ", |text| {
            self.make_chunk(
                text,
                chunk_index,
                current_start,
                current_start + current.len(),
                sentences_in_chunk,
                source,
            )
        });

        info!(
            total_chunks = chunks.len(),
            total_chars = text.len(),
            "text chunked"
        );

        ChunkResult::from_chunks(chunks, text.len(), None)
    }
}

/// Packs whole paragraphs into chunks, carrying heading context.
///
/// Paragraphs are accumulated in document order. Each paragraph that falls
/// under a heading is prefixed with that heading, so retrieved chunks stay
/// self-contained. A buffer is closed when adding the next paragraph would
/// exceed `max_chunk_size`, or would exceed `target_chunk_size` while the
/// buffer has already reached `min_chunk_size`. Overlap between consecutive
/// chunks is built from whole trailing sentences, never split mid-sentence.
pub struct SemanticChunker {
    config: SemanticChunkConfig,
    detector: Arc<dyn BoundaryDetector>,
}

impl SemanticChunker {
    /// Create a chunker, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if
    /// `min_chunk_size > max_chunk_size` or
    /// `overlap_size >= target_chunk_size`.
    pub fn new(config: SemanticChunkConfig) -> Result<Self> {
        if config.min_chunk_size > config.max_chunk_size {
            return Err(RagError::ConfigError(format!(
                "min_chunk_size ({}) must not exceed max_chunk_size ({})",
                config.min_chunk_size, config.max_chunk_size
            )));
        }
        if config.overlap_size >= config.target_chunk_size {
            return Err(RagError::ConfigError(format!(
                "overlap_size ({}) must be less than target_chunk_size ({})",
                config.overlap_size, config.target_chunk_size
            )));
        }
        Ok(Self { config, detector: Arc::new(HeuristicDetector::new()) })
    }

    /// Replace the boundary detector.
    pub fn with_detector(mut self, detector: Arc<dyn BoundaryDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Collect whole sentences from the end of `text` until the overlap
    /// budget (1.5x `overlap_size`) would be exceeded.
    fn overlap_text(&self, text: &str) -> (String, usize) {
        let budget = self.config.overlap_size + self.config.overlap_size / 2;
        let sentences = self.detector.split_sentences(text);
        let mut overlap = String::new();
        let mut count = 0;

        for sentence in sentences.iter().rev() {
            let extra = if overlap.is_empty() { sentence.len() } else { sentence.len() + 1 };
            if overlap.len() + extra > budget {
                break;
            }
            if overlap.is_empty() {
                overlap = sentence.clone();
            } else {
                overlap = format!("{sentence} {overlap}");
            }
            count += 1;
        }

        (overlap, count)
    }

    fn make_chunk(
        &self,
        text: &str,
        index: usize,
        start: usize,
        end: usize,
        heading: Option<&str>,
        sentences: usize,
        source: &ChunkSource,
    ) -> Chunk {
        let mut metadata = ChunkMetadata::for_source(source, ChunkKind::Paragraph);
        metadata.heading_text = heading.map(str::to_string);
        metadata.word_count = text.split_whitespace().count();
        metadata.sentence_count = sentences;
        Chunk { text: text.to_string(), index, start_char: start, end_char: end, metadata }
    }
}

impl Chunker for SemanticChunker {
    fn chunk(&self, text: &str, source: &ChunkSource) -> ChunkResult {
        let SemanticChunkConfig { target_chunk_size, min_chunk_size, max_chunk_size, .. } =
            self.config;

        if text.trim().is_empty() {
            return ChunkResult::from_chunks(Vec::new(), 0, Some(StructureStats::default()));
        }

        let structure = self.detector.analyze(text);
        let stats = StructureStats {
            paragraphs_detected: structure.paragraphs.len(),
            headings_detected: structure.headings.len(),
        };

        debug!(
            text_len = text.len(),
            paragraphs = stats.paragraphs_detected,
            headings = stats.headings_detected,
            "creating semantic chunks"
        );

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();
        let mut current_start = 0;
        let mut chunk_index = 0;
        let mut current_heading: Option<String> = None;
        let mut sentences_in_chunk = 0;

        for paragraph in &structure.paragraphs {
            // Track the most recent heading preceding this paragraph.
            if let Some(heading) = structure
                .headings
                .iter()
                .find(|h| h.position >= current_start && h.position < paragraph.start)
            {
                current_heading = Some(heading.text.clone());
            }

            let sentence_count = self.detector.split_sentences(&paragraph.text).len();

            let with_heading = match &current_heading {
                Some(heading) => format!("{heading}\n\n{}", paragraph.text),
                None => paragraph.text.clone(),
            };

            let potential_len = if current.is_empty() {
                with_heading.len()
            } else {
                current.len() + 2 + with_heading.len()
            };

            let should_close = !current.is_empty()
                && (potential_len > max_chunk_size
                    || (potential_len > target_chunk_size && current.len() >= min_chunk_size));

            if should_close {
                let end = current_start + current.len();
                chunks.push(self.make_chunk(
                    current.trim(),
                    chunk_index,
                    current_start,
                    end,
                    current_heading.as_deref(),
                    sentences_in_chunk,
                    source,
                ));
                chunk_index += 1;

                let (overlap, overlap_sentences) = self.overlap_text(&current);
                current_start += current.len() - overlap.len();
                current = if overlap.is_empty() {
                    with_heading
                } else {
                    format!("{overlap}\n\n{with_heading}")
                };
                sentences_in_chunk = overlap_sentences + sentence_count;
            } else if current.is_empty() {
                current = with_heading;
                sentences_in_chunk = sentence_count;
            } else {
                current.push_str("\n\n");
                current.push_str(&with_heading);
                sentences_in_chunk += sentence_count;
            }
        }

        finish_buffer(&mut chunks, &current, min_chunk_size, "\n\n", |text| {
            self.make_chunk(
                text,
                chunk_index,
                current_start,
                current_start + current.len(),
                current_heading.as_deref(),
                sentences_in_chunk,
                source,
            )
        });

        info!(
            total_chunks = chunks.len(),
            total_chars = text.len(),
            paragraphs = stats.paragraphs_detected,
            headings = stats.headings_detected,
            "semantic chunks created"
        );

        ChunkResult::from_chunks(chunks, text.len(), Some(stats))
    }
}

/// Close out the final buffer: emit it when it meets `min_chunk_size` or is
/// the only chunk, otherwise merge it into the previous chunk.
fn finish_buffer<F>(chunks: &mut Vec<Chunk>, current: &str, min_chunk_size: usize, joiner: &str, make: F)
where
    F: FnOnce(&str) -> Chunk,
{
    let trimmed = current.trim();
    if trimmed.is_empty() {
        return;
    }
    if trimmed.len() >= min_chunk_size || chunks.is_empty() {
        chunks.push(make(trimmed));
    } else if let Some(last) = chunks.last_mut() {
        last.text.push_str(joiner);
        last.text.push_str(trimmed);
        last.end_char += current.len();
        last.metadata.word_count = last.text.split_whitespace().count();
    }
}

/// Round `index` up to the nearest char boundary of `text`.
fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
