//! Error types for the `ragcore` crate.

use thiserror::Error;

/// Errors that can occur in chunking, ingestion, and retrieval operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A chunking or retrieval configuration violated a caller contract.
    ///
    /// Configuration errors are raised at construction time and are never
    /// silently clamped.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error occurred during embedding generation.
    ///
    /// Treated as transient; retry policy belongs to the caller.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index backend.
    #[error("Vector index error ({backend}): {message}")]
    IndexError {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Document ingestion failed partway through.
    ///
    /// No partial vector state is considered durable; the caller must retry
    /// the whole document.
    #[error("Ingestion error: {0}")]
    IngestError(String),

    /// A retrieval query failed.
    ///
    /// Note that zero matches is a valid result, not an error.
    #[error("Retrieval error: {0}")]
    RetrievalError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
