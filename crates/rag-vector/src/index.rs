//! Search result and statistics types.

/// Result of a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Identifier of the matched vector
    pub id: u64,
    /// Inner-product similarity in [-1, 1] (higher = more similar)
    pub score: f32,
}

impl SearchResult {
    pub fn new(id: u64, score: f32) -> Self {
        Self { id, score }
    }
}

/// Index statistics.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of live vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Persisted index file size in bytes (0 if never persisted)
    pub size_bytes: u64,
}
