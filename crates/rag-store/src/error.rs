//! Chunk store error types.

use thiserror::Error;

/// Errors that can occur during chunk store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Appended records do not continue the identifier sequence.
    /// Should never surface in correct single-writer operation.
    #[error("Identifier gap: expected next id {expected}, got {actual}")]
    IdentifierGap { expected: u64, actual: u64 },

    /// Persisted metadata file exists but cannot be parsed
    #[error("Corrupt metadata file: {0}")]
    Corrupt(String),

    /// Serialization error while persisting
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
