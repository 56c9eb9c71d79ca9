//! Context-to-completion prompt assembly.
//!
//! Combines a [`RagContext`] with conversation history and an optional
//! domain hint into a single prompt payload for the downstream completion
//! call, and derives the usage metadata external collaborators record for
//! audit and billing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retriever::RagContext;

/// Default number of trailing history messages kept in the prompt.
pub const DEFAULT_HISTORY_LIMIT: usize = 6;

/// The role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions to the model.
    System,
    /// The end user.
    User,
    /// The model's own replies.
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Subject-matter domain used to sharpen the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptDomain {
    /// Contracts, compliance, legal documents.
    Legal,
    /// Reports, strategy, financial documents.
    Business,
    /// Specifications, APIs, technical documentation.
    Technical,
    /// Anything else.
    General,
}

impl PromptDomain {
    /// Domain-specific guidance prepended to the grounded system prompt.
    fn preamble(self) -> &'static str {
        match self {
            Self::Legal => {
                "You are a highly qualified legal assistant with expertise in legal \
                 documents and contracts. Use precise legal terminology, cite the legal \
                 basis when it is visible in the documents, and make clear that your \
                 answers are informational and not legal advice."
            }
            Self::Business => {
                "You are a professional business analyst and strategic advisor. \
                 Identify KPIs, opportunities, and risks, structure complex answers as \
                 bullet points, and always state the source of any figure you cite."
            }
            Self::Technical => {
                "You are a technical expert with a deep understanding of system \
                 architectures, APIs, and documentation. Use correct terminology, put \
                 code and configuration in code blocks, and mention security or \
                 performance implications where relevant."
            }
            Self::General => {
                "You are an intelligent, helpful assistant that precisely analyzes and \
                 answers questions based on documents."
            }
        }
    }
}

/// Keyword lists for domain detection; German variants included since
/// uploaded documents are frequently German.
const LEGAL_KEYWORDS: &[&str] =
    &["vertrag", "contract", "vereinbarung", "klausel", "paragraph", "gesetz", "recht", "anwalt", "gericht", "urteil", "agb", "compliance"];
const BUSINESS_KEYWORDS: &[&str] =
    &["geschäft", "business", "strategie", "strategy", "quartal", "quarter", "umsatz", "revenue", "bilanz", "balance", "kpi", "roi", "ebitda"];
const TECHNICAL_KEYWORDS: &[&str] =
    &["api", "code", "software", "system", "architektur", "architecture", "endpoint", "database", "server", "technisch", "technical", "specification"];

/// Best-effort domain detection from a document name and leading content.
///
/// Matches keyword lists against the lowercased name plus the first
/// kilobyte of content; first match wins in the order legal, business,
/// technical.
pub fn detect_domain(document_name: Option<&str>, content: Option<&str>) -> PromptDomain {
    let name = document_name.unwrap_or_default().to_lowercase();
    let content = content.unwrap_or_default().to_lowercase();
    let head = &content[..floor_char_boundary(&content, 1000.min(content.len()))];
    let text = format!("{name} {head}");

    if LEGAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        PromptDomain::Legal
    } else if BUSINESS_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        PromptDomain::Business
    } else if TECHNICAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        PromptDomain::Technical
    } else {
        PromptDomain::General
    }
}

/// Round `index` down to the nearest char boundary of `text`.
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// The assembled prompt for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptPayload {
    /// The system prompt, sent before `messages`.
    pub system_prompt: String,
    /// Truncated conversation history followed by the new user query.
    pub messages: Vec<ChatMessage>,
}

/// Usage metadata derived from one retrieval-plus-assembly round.
///
/// Recorded for audit and usage accounting by external collaborators; this
/// core does not consume it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalUsage {
    /// Estimated prompt tokens across system prompt and messages.
    pub estimated_tokens: usize,
    /// Wall-clock time spent on retrieval and assembly.
    pub elapsed: Duration,
    /// Number of chunks retained in the context.
    pub chunk_count: usize,
    /// Mean score of the retained chunks, 0.0 when none were retained.
    pub avg_score: f32,
}

impl RetrievalUsage {
    /// Derive usage metadata from a built payload.
    pub fn capture(context: &RagContext, payload: &PromptPayload, elapsed: Duration) -> Self {
        let text_len: usize = payload.system_prompt.len()
            + payload.messages.iter().map(|m| m.content.len()).sum::<usize>();
        let avg_score = if context.relevant_chunks.is_empty() {
            0.0
        } else {
            context.relevant_chunks.iter().map(|c| c.score).sum::<f32>()
                / context.relevant_chunks.len() as f32
        };
        Self {
            estimated_tokens: estimate_tokens_from_len(text_len),
            elapsed,
            chunk_count: context.relevant_chunks.len(),
            avg_score,
        }
    }
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    estimate_tokens_from_len(text.len())
}

fn estimate_tokens_from_len(len: usize) -> usize {
    len.div_ceil(4)
}

/// System prompt used when retrieval found nothing relevant.
///
/// Explicitly instructs the model to say so instead of guessing; this is a
/// correctness requirement, not a style preference.
const NO_CONTEXT_PROMPT: &str = "You are a helpful AI assistant. The user asked a question, \
but no relevant information was found in their documents.

Please let them know that you couldn't find relevant information in their uploaded documents \
to answer this question. Suggest they either:
1. Upload documents that contain information about this topic
2. Rephrase their question
3. Ask a different question about their existing documents

Be polite and helpful. Do not answer from general knowledge.";

/// Assembles completion prompts from retrieval contexts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    history_limit: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    /// Create a builder keeping the default six trailing history messages.
    pub fn new() -> Self {
        Self { history_limit: DEFAULT_HISTORY_LIMIT }
    }

    /// Override how many trailing history messages are kept.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Build the prompt payload for a completion request.
    ///
    /// When `context` holds no chunks the system prompt tells the model to
    /// report that nothing relevant was found. Otherwise the context text is
    /// embedded verbatim, with instructions to answer only from it and cite
    /// source document names. History is truncated to the most recent
    /// `history_limit` messages, then the query is appended as the final
    /// user message.
    pub fn build_prompt(
        &self,
        context: &RagContext,
        history: &[ChatMessage],
        domain: Option<PromptDomain>,
    ) -> PromptPayload {
        let system_prompt = if context.relevant_chunks.is_empty() {
            NO_CONTEXT_PROMPT.to_string()
        } else {
            self.grounded_prompt(context, domain.unwrap_or(PromptDomain::General))
        };

        let tail = history.len().saturating_sub(self.history_limit);
        let mut messages: Vec<ChatMessage> = history[tail..].to_vec();
        messages.push(ChatMessage::user(context.query.clone()));

        PromptPayload { system_prompt, messages }
    }

    fn grounded_prompt(&self, context: &RagContext, domain: PromptDomain) -> String {
        format!(
            "{}

IMPORTANT INSTRUCTIONS:
1. Base your answer ONLY on the information provided in the context below
2. If the context doesn't contain enough information to answer the question, say so clearly
3. Cite which document(s) you're referencing in your answer
4. Be concise but thorough
5. If you're unsure, express uncertainty rather than making up information

RELEVANT CONTEXT FROM USER'S DOCUMENTS:

{}

---

Now, answer the user's question based on this context. If the context doesn't contain \
relevant information, be honest about it.",
            domain.preamble(),
            context.context_text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::RankedChunk;

    fn context_with_chunks(count: usize) -> RagContext {
        let relevant_chunks: Vec<RankedChunk> = (0..count)
            .map(|i| RankedChunk {
                document_id: format!("d{i}"),
                document_name: format!("doc-{i}.pdf"),
                chunk_index: i,
                content: format!("chunk body {i}"),
                score: 0.9,
                page_number: None,
                section: None,
            })
            .collect();
        RagContext {
            query: "what are the payment terms?".to_string(),
            context_text: if count == 0 { String::new() } else { "CONTEXT BLOCK".to_string() },
            total_candidates: count,
            relevant_chunks,
        }
    }

    #[test]
    fn empty_context_instructs_model_to_admit_no_information() {
        let payload = PromptBuilder::new().build_prompt(&context_with_chunks(0), &[], None);
        assert!(payload.system_prompt.contains("no relevant information was found"));
        assert!(!payload.system_prompt.contains("RELEVANT CONTEXT"));
    }

    #[test]
    fn grounded_prompt_embeds_context_verbatim() {
        let payload = PromptBuilder::new().build_prompt(&context_with_chunks(2), &[], None);
        assert!(payload.system_prompt.contains("CONTEXT BLOCK"));
        assert!(payload.system_prompt.contains("ONLY on the information provided"));
    }

    #[test]
    fn history_is_truncated_to_most_recent_messages() {
        let history: Vec<ChatMessage> =
            (0..10).map(|i| ChatMessage::user(format!("message {i}"))).collect();
        let payload = PromptBuilder::new().build_prompt(&context_with_chunks(1), &history, None);

        // Six history messages plus the final query.
        assert_eq!(payload.messages.len(), 7);
        assert_eq!(payload.messages[0].content, "message 4");
        let last = payload.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "what are the payment terms?");
    }

    #[test]
    fn domain_detection_matches_keywords() {
        assert_eq!(detect_domain(Some("Mietvertrag.pdf"), None), PromptDomain::Legal);
        assert_eq!(detect_domain(None, Some("Q3 revenue grew by 12%")), PromptDomain::Business);
        assert_eq!(detect_domain(Some("api-reference.md"), None), PromptDomain::Technical);
        assert_eq!(detect_domain(Some("recipes.txt"), Some("bake at 180C")), PromptDomain::General);
    }

    #[test]
    fn domain_preamble_is_applied() {
        let payload = PromptBuilder::new().build_prompt(
            &context_with_chunks(1),
            &[],
            Some(PromptDomain::Legal),
        );
        assert!(payload.system_prompt.contains("legal assistant"));
    }

    #[test]
    fn usage_capture_summarizes_payload() {
        let context = context_with_chunks(2);
        let payload = PromptBuilder::new().build_prompt(&context, &[], None);
        let usage = RetrievalUsage::capture(&context, &payload, Duration::from_millis(42));

        assert_eq!(usage.chunk_count, 2);
        assert!((usage.avg_score - 0.9).abs() < 1e-6);
        assert_eq!(usage.elapsed, Duration::from_millis(42));
        let total_len = payload.system_prompt.len()
            + payload.messages.iter().map(|m| m.content.len()).sum::<usize>();
        assert_eq!(usage.estimated_tokens, total_len.div_ceil(4));
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
