//! Property tests for chunking invariants.

use proptest::prelude::*;

use ragcore::chunking::{
    Chunker, FixedChunkConfig, SemanticChunkConfig, SemanticChunker, SentenceChunker,
};
use ragcore::document::ChunkSource;

const CHUNK_SIZE: usize = 120;
const OVERLAP: usize = 30;
const MIN_CHUNK: usize = 30;

fn source() -> ChunkSource {
    ChunkSource::new("notes.txt", "txt")
}

/// Generate a lowercase sentence of one to four short words.
///
/// Lowercase first letters keep the structure analyzer from classifying any
/// line as a heading, so these texts exercise plain packing.
fn arb_sentence() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{2,8}", 1..5).prop_map(|words| format!("{}.", words.join(" ")))
}

/// Generate running text of space-joined sentences.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(arb_sentence(), 1..60).prop_map(|sentences| sentences.join(" "))
}

/// Generate text of blank-line-separated paragraphs, each one to three
/// sentences long.
fn arb_paragraph_text() -> impl Strategy<Value = String> {
    let paragraph = proptest::collection::vec(arb_sentence(), 1..4)
        .prop_map(|sentences| sentences.join(" "));
    proptest::collection::vec(paragraph, 1..20).prop_map(|paragraphs| paragraphs.join("\n\n"))
}

fn fixed_chunker() -> SentenceChunker {
    SentenceChunker::new(FixedChunkConfig {
        chunk_size: CHUNK_SIZE,
        chunk_overlap: OVERLAP,
        min_chunk_size: MIN_CHUNK,
    })
    .unwrap()
}

/// For any sentence-joined text, fixed chunking SHALL keep every chunk
/// within `chunk_size` characters, except a final chunk that absorbed an
/// under-sized trailer, which may exceed it by at most `min_chunk_size`
/// plus the joiner.
mod prop_fixed_chunk_sizes {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunk_sizes_are_bounded(text in arb_text()) {
            let result = fixed_chunker().chunk(&text, &source());

            for chunk in &result.chunks[..result.chunks.len().saturating_sub(1)] {
                prop_assert!(
                    chunk.text.len() <= CHUNK_SIZE,
                    "non-final chunk of {} chars exceeds {}",
                    chunk.text.len(),
                    CHUNK_SIZE,
                );
            }
            if let Some(last) = result.chunks.last() {
                prop_assert!(last.text.len() <= CHUNK_SIZE + MIN_CHUNK + 1);
            }
        }
    }
}

/// For any input, chunk indexes SHALL increase strictly from zero and
/// character offsets SHALL be monotone, with `end_char` never before
/// `start_char`.
mod prop_chunk_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn indexes_and_offsets_are_monotone(text in arb_text()) {
            let result = fixed_chunker().chunk(&text, &source());

            for (i, chunk) in result.chunks.iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
                prop_assert!(chunk.end_char >= chunk.start_char);
            }
            for pair in result.chunks.windows(2) {
                prop_assert!(pair[1].start_char >= pair[0].start_char);
                prop_assert!(pair[1].end_char >= pair[0].end_char);
            }

            // No text is silently dropped: the chunks span the document.
            if let (Some(first), Some(last)) = (result.chunks.first(), result.chunks.last()) {
                prop_assert_eq!(first.start_char, 0);
                prop_assert!(last.end_char >= text.len());
            }
        }
    }
}

/// For any consecutive chunk pair, the successor SHALL begin with the
/// trailing overlap of its predecessor.
mod prop_fixed_chunk_overlap {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn successor_starts_with_predecessor_suffix(text in arb_text()) {
            let result = fixed_chunker().chunk(&text, &source());

            for pair in result.chunks.windows(2) {
                let suffix: String = pair[0].text.chars().rev().take(OVERLAP).collect();
                let suffix: String = suffix.chars().rev().collect();
                prop_assert!(
                    pair[1].text.starts_with(suffix.trim_start()),
                    "chunk {} does not start with predecessor overlap",
                    pair[1].index,
                );
            }
        }
    }
}

/// Chunking SHALL be a pure function of its inputs: repeated runs over the
/// same text produce identical results, and every chunk is non-empty.
mod prop_chunking_determinism {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn repeated_runs_agree(text in arb_text()) {
            let chunker = fixed_chunker();
            let first = chunker.chunk(&text, &source());
            let second = chunker.chunk(&text, &source());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.total_chunks, first.chunks.len());
            for chunk in &first.chunks {
                prop_assert!(!chunk.text.trim().is_empty());
            }
        }
    }
}

/// For any paragraph-structured text, semantic chunking SHALL keep every
/// chunk within `max_chunk_size` (final merged chunk excepted), report the
/// paragraph count it detected, and stay deterministic.
mod prop_semantic_chunk_bounds {
    use super::*;

    const TARGET: usize = 250;
    const MIN: usize = 50;
    const MAX: usize = 400;

    fn semantic_chunker() -> SemanticChunker {
        SemanticChunker::new(SemanticChunkConfig {
            target_chunk_size: TARGET,
            min_chunk_size: MIN,
            max_chunk_size: MAX,
            overlap_size: 60,
            respect_paragraphs: true,
            respect_sentences: true,
        })
        .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(150))]

        #[test]
        fn chunks_bounded_and_structure_reported(text in arb_paragraph_text()) {
            let chunker = semantic_chunker();
            let result = chunker.chunk(&text, &source());

            for chunk in &result.chunks[..result.chunks.len().saturating_sub(1)] {
                prop_assert!(chunk.text.len() <= MAX);
            }
            if let Some(last) = result.chunks.last() {
                prop_assert!(last.text.len() <= MAX + MIN + 2);
            }

            let stats = result.structure.expect("semantic results carry structure stats");
            let expected_paragraphs = text.split("\n\n").filter(|p| !p.trim().is_empty()).count();
            prop_assert_eq!(stats.paragraphs_detected, expected_paragraphs);

            let second = chunker.chunk(&text, &source());
            prop_assert_eq!(result, second);
        }
    }
}
