//! Generation gateway error types.

use thiserror::Error;

/// Errors that can occur while generating an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Gateway is missing required configuration
    #[error("Generation gateway not configured: {0}")]
    NotConfigured(String),

    /// HTTP/API error from the generation service
    #[error("Generation API error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("Generation API rate limit exceeded")]
    RateLimitExceeded,

    /// Response could not be parsed
    #[error("Generation response parse error: {0}")]
    Parse(String),
}
