//! Sentence and document-structure analysis.
//!
//! This module provides the [`BoundaryDetector`] trait and its default
//! regex-based implementation, [`HeuristicDetector`]. Boundary detection is
//! kept behind a trait so alternative detectors can be swapped in without
//! touching the chunk-packing algorithms.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder substituted for protected periods while splitting.
const DOT_MASK: &str = "<DOT>";

/// A heading candidate detected in a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Heading {
    /// The heading line, trimmed.
    pub text: String,
    /// Byte offset of the line start in the source text.
    pub position: usize,
    /// 1 for all-caps headings, 2 otherwise.
    pub level: u8,
}

/// A paragraph block detected in a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paragraph {
    /// The paragraph text, trimmed.
    pub text: String,
    /// Byte offset of the block start in the source text.
    pub start: usize,
    /// Byte offset one past the block end.
    pub end: usize,
}

/// Headings and paragraphs detected by [`BoundaryDetector::analyze`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentStructure {
    /// Heading candidates in document order.
    pub headings: Vec<Heading>,
    /// Non-empty paragraph blocks in document order.
    pub paragraphs: Vec<Paragraph>,
}

/// A strategy for detecting sentence boundaries and document structure.
///
/// Implementations must treat empty input as a valid document: both methods
/// return empty collections, never an error.
pub trait BoundaryDetector: Send + Sync {
    /// Split text into sentences.
    ///
    /// Protected abbreviations (e.g. "Dr.", "etc.") and numbered list
    /// markers ("1.") must not terminate a sentence.
    fn split_sentences(&self, text: &str) -> Vec<String>;

    /// Detect headings and paragraphs in the text.
    fn analyze(&self, text: &str) -> DocumentStructure;
}

/// The default regex-based [`BoundaryDetector`].
///
/// Sentence splitting masks a configurable abbreviation list and numbered
/// list markers before splitting on `[.!?]+` followed by whitespace or end
/// of input. Heading detection is best-effort: a line qualifies if it is
/// short, starts uppercase, and lacks trailing sentence punctuation; or is
/// fully upper-case with at least one letter; or starts with a numbering
/// pattern. No single rule is authoritative.
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    abbreviations: Vec<String>,
    sentence_end: Regex,
    list_marker: Regex,
    numbering: Regex,
    blank_line: Regex,
}

impl HeuristicDetector {
    /// Default protected abbreviations, covering common English and German
    /// forms from the kinds of documents users upload.
    pub const DEFAULT_ABBREVIATIONS: &'static [&'static str] =
        &["Dr.", "Mr.", "Mrs.", "Ms.", "Prof.", "z.B.", "u.a.", "etc.", "bzw."];

    /// Create a detector with the default abbreviation list.
    pub fn new() -> Self {
        Self::with_abbreviations(
            Self::DEFAULT_ABBREVIATIONS.iter().map(|s| (*s).to_string()).collect(),
        )
    }

    /// Create a detector with a custom protected-abbreviation list.
    ///
    /// Each entry is matched literally, including its periods.
    pub fn with_abbreviations(abbreviations: Vec<String>) -> Self {
        Self {
            abbreviations,
            sentence_end: Regex::new(r"[.!?]+(\s+|$)").expect("valid sentence pattern"),
            list_marker: Regex::new(r"(\d+)\.").expect("valid list marker pattern"),
            numbering: Regex::new(r"^(\d+\.|\d+\)|\([a-z]\)|[A-Z]\.)").expect("valid numbering"),
            blank_line: Regex::new(r"\n\s*\n").expect("valid blank line pattern"),
        }
    }

    /// Mask protected periods so they survive sentence splitting.
    fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for abbr in &self.abbreviations {
            if masked.contains(abbr.as_str()) {
                masked = masked.replace(abbr.as_str(), &abbr.replace('.', DOT_MASK));
            }
        }
        self.list_marker.replace_all(&masked, format!("${{1}}{DOT_MASK}")).into_owned()
    }
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryDetector for HeuristicDetector {
    fn split_sentences(&self, text: &str) -> Vec<String> {
        let masked = self.mask(text);
        let mut sentences = Vec::new();
        let mut last = 0;

        for m in self.sentence_end.find_iter(&masked) {
            let sentence = masked[last..m.end()].trim().replace(DOT_MASK, ".");
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            last = m.end();
        }

        if last < masked.len() {
            let remaining = masked[last..].trim().replace(DOT_MASK, ".");
            if !remaining.is_empty() {
                sentences.push(remaining);
            }
        }

        sentences
    }

    fn analyze(&self, text: &str) -> DocumentStructure {
        let mut structure = DocumentStructure::default();

        let mut position = 0;
        for line in text.split('\n') {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                let is_short = trimmed.len() < 100;
                let starts_upper = trimmed.chars().next().is_some_and(char::is_uppercase);
                let ends_plain = !trimmed.ends_with(['.', '!', '?', ',', ';', ':']);
                let has_letter = trimmed.chars().any(char::is_alphabetic);
                let is_all_caps = has_letter && trimmed == trimmed.to_uppercase();
                let has_numbering = self.numbering.is_match(trimmed);

                if (is_short && starts_upper && ends_plain) || is_all_caps || has_numbering {
                    structure.headings.push(Heading {
                        text: trimmed.to_string(),
                        position,
                        level: if is_all_caps { 1 } else { 2 },
                    });
                }
            }
            position += line.len() + 1;
        }

        let mut start = 0;
        for sep in self.blank_line.find_iter(text) {
            push_paragraph(&mut structure.paragraphs, text, start, sep.start());
            start = sep.end();
        }
        push_paragraph(&mut structure.paragraphs, text, start, text.len());

        tracing::debug!(
            headings = structure.headings.len(),
            paragraphs = structure.paragraphs.len(),
            "document structure analyzed"
        );

        structure
    }
}

/// Record the block `[start, end)` as a paragraph if it has content.
fn push_paragraph(paragraphs: &mut Vec<Paragraph>, text: &str, start: usize, end: usize) {
    let block = text[start..end].trim();
    if !block.is_empty() {
        paragraphs.push(Paragraph { text: block.to_string(), start, end });
    }
}
