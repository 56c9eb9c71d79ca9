//! Retrieval configuration.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the retriever.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetrieverConfig {
    /// Default number of chunks to retain per query.
    pub top_k: usize,
    /// Default minimum similarity score for retained chunks.
    pub min_score: f32,
    /// Over-fetch multiplier applied to `top_k` when querying the index.
    ///
    /// Over-fetching compensates for post-filtering rejection. This is an
    /// implementation-tunable constant, not a contract: indexes that filter
    /// by score server-side need less headroom.
    pub overfetch_factor: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { top_k: 5, min_score: 0.7, overfetch_factor: 2 }
    }
}

impl RetrieverConfig {
    /// Create a new builder for constructing a [`RetrieverConfig`].
    pub fn builder() -> RetrieverConfigBuilder {
        RetrieverConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RetrieverConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrieverConfigBuilder {
    config: RetrieverConfig,
}

impl RetrieverConfigBuilder {
    /// Set the default number of chunks retained per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the default minimum similarity score.
    pub fn min_score(mut self, score: f32) -> Self {
        self.config.min_score = score;
        self
    }

    /// Set the over-fetch multiplier.
    pub fn overfetch_factor(mut self, factor: usize) -> Self {
        self.config.overfetch_factor = factor;
        self
    }

    /// Build the [`RetrieverConfig`], validating that parameters are
    /// consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k == 0`, if `min_score`
    /// lies outside `[0, 1]`, or if `overfetch_factor == 0`.
    pub fn build(self) -> Result<RetrieverConfig> {
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.config.min_score) {
            return Err(RagError::ConfigError(format!(
                "min_score ({}) must lie in [0, 1]",
                self.config.min_score
            )));
        }
        if self.config.overfetch_factor == 0 {
            return Err(RagError::ConfigError(
                "overfetch_factor must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}
