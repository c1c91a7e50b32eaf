//! Chunk record type.
//!
//! A chunk record is the metadata half of an indexed chunk: the vector
//! index holds `(id, vector)` and the chunk store holds `(id, source,
//! ordinal, text)`. The identifier is the join key between the two.

use serde::{Deserialize, Serialize};

/// Metadata for one indexed chunk.
///
/// Records are immutable once written and only ever appended. The
/// identifier equals the record's position in the chunk collection at
/// the time it was first assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Stable identifier, shared with the vector index
    pub id: u64,
    /// Originating document name
    pub source: String,
    /// 1-based position within the source document's chunks
    pub chunk_ordinal: u32,
    /// Chunk text as submitted for embedding
    pub text: String,
}

impl ChunkRecord {
    pub fn new(id: u64, source: impl Into<String>, chunk_ordinal: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            chunk_ordinal,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let record = ChunkRecord::new(3, "doc.txt", 2, "some chunk text");
        let json = serde_json::to_string(&record).unwrap();
        let decoded: ChunkRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_field_names_stable() {
        // The metadata file is human-inspectable; field names are part
        // of the on-disk contract.
        let record = ChunkRecord::new(0, "a.md", 1, "t");
        let json = serde_json::to_string(&record).unwrap();
        for field in ["\"id\"", "\"source\"", "\"chunk_ordinal\"", "\"text\""] {
            assert!(json.contains(field), "missing field {field} in {json}");
        }
    }
}
