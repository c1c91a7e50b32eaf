//! Embedding gateway error types.

use thiserror::Error;

/// Errors that can occur while generating embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Gateway is missing required configuration (e.g., API key)
    #[error("Embedding gateway not configured: {0}")]
    NotConfigured(String),

    /// HTTP/API error from the embedding service
    #[error("Embedding API error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("Embedding API rate limit exceeded")]
    RateLimitExceeded,

    /// Response could not be parsed
    #[error("Embedding response parse error: {0}")]
    Parse(String),

    /// Gateway returned no vectors for a non-empty input
    #[error("Embedding gateway returned no vectors")]
    EmptyResponse,

    /// Row count does not match input count
    #[error("Embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },
}
