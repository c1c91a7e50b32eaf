//! Vector index error types.

use thiserror::Error;

/// Errors that can occur during vector index operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Dimension mismatch between the index and a vector or a
    /// persisted file. Never reconciled silently.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Identifier already present in the index
    #[error("Identifier already exists: {0}")]
    IdExists(u64),

    /// Batch insert called with unequal id/vector counts
    #[error("Batch length mismatch: {ids} ids, {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    /// Persisted index file exists but cannot be parsed. A corrupt
    /// file is a hard error, never treated as an absent index.
    #[error("Corrupt index file: {0}")]
    Corrupt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
