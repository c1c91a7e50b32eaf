//! Error types for the RAG store.

use thiserror::Error;

/// Unified error type surfaced by the ingestion and query pipelines.
///
/// Every variant carries enough detail for the caller to act; none of
/// these are retried or swallowed at this layer.
#[derive(Debug, Error)]
pub enum RagError {
    /// Bad caller input: empty question, unsupported file type,
    /// oversized upload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No extractable text or no chunks produced from a document
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    /// Embedding gateway returned nothing or a count mismatch
    #[error("Embedding failure: {0}")]
    EmbeddingFailure(String),

    /// Persisted index dimension disagrees with the embedding model.
    /// Fatal: the store must be explicitly reset before continuing.
    #[error(
        "Index dimension mismatch: persisted index has dimension {expected}, \
         embedding has dimension {actual}; reset the store or align the embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    /// Identifier continuity violated on append. Should never surface
    /// in correct single-writer operation; indicates a concurrency bug.
    #[error("Identifier gap: expected next id {expected}, got {actual}")]
    IdentifierGap { expected: u64, actual: u64 },

    /// Query against an empty or absent store
    #[error("Empty store: {0}")]
    EmptyStore(String),

    /// Persistence failure in the vector index or chunk store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generation gateway failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
