//! Ingestion result types.

use serde::{Deserialize, Serialize};

/// Outcome of one document ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Document name the chunks were attributed to
    pub document: String,
    /// Chunks indexed from this document
    pub chunks_indexed: u32,
    /// Total chunks in the store after this ingestion
    pub total_chunks: u32,
}
