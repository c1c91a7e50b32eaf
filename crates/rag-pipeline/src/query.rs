//! Query result types.

use serde::{Deserialize, Serialize};

/// One retrieved context passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextHit {
    /// Chunk identifier
    pub id: u64,
    /// Originating document name
    pub source: String,
    /// 1-based position within the source document
    pub chunk_ordinal: u32,
    /// Chunk text
    pub text: String,
    /// Inner-product similarity in [-1, 1]
    pub score: f32,
}

/// Response to a query: the generated (or degraded-mode) answer plus
/// the supporting contexts in descending score order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Answer text
    pub answer: String,
    /// Supporting passages, best first
    pub contexts: Vec<ContextHit>,
}
