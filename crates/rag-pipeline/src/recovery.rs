//! Store divergence detection and repair.
//!
//! The two persisted stores can disagree after a crash between the two
//! persist calls of an ingestion. The persist order (index first)
//! means the expected divergence is extra index identifiers with no
//! chunk record behind them; a hand-damaged store can disagree in
//! either direction. Repair truncates both stores to the longest
//! common contiguous identifier prefix - nothing a chunk record can
//! describe is lost, and the affected document can simply be
//! re-ingested.

use tracing::warn;

use rag_store::ChunkStore;
use rag_vector::FlatIndex;

/// What a repair pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// Index entries removed
    pub vectors_removed: usize,
    /// Chunk records removed
    pub records_removed: usize,
}

impl RepairStats {
    /// Whether the pass changed anything.
    pub fn repaired(&self) -> bool {
        self.vectors_removed > 0 || self.records_removed > 0
    }
}

/// Check whether the two stores agree: same count, and the index holds
/// exactly the identifiers `0..len`.
pub fn in_sync(index: &FlatIndex, store: &ChunkStore) -> bool {
    index.len() == store.len() && index.ids().eq(0..store.len() as u64)
}

/// Truncate both stores to their longest common contiguous prefix.
///
/// Mutates in memory only; the caller persists both stores afterwards
/// (index first, matching the ingestion order).
pub fn reconcile(index: &mut FlatIndex, store: &mut ChunkStore) -> RepairStats {
    if in_sync(index, store) {
        return RepairStats::default();
    }

    let mut common = 0u64;
    while common < store.len() as u64 && index.contains(common) {
        common += 1;
    }

    let stats = RepairStats {
        vectors_removed: index.truncate_from(common),
        records_removed: store.len() - common as usize,
    };
    store.truncate_to(common as usize);

    warn!(
        common_prefix = common,
        vectors_removed = stats.vectors_removed,
        records_removed = stats.records_removed,
        "Stores diverged; truncated to common prefix"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_embeddings::Embedding;
    use rag_types::ChunkRecord;
    use tempfile::TempDir;

    fn unit_embedding(dim: usize, axis: usize) -> Embedding {
        let mut values = vec![0.0; dim];
        values[axis % dim] = 1.0;
        Embedding::new(values)
    }

    fn populated(temp: &TempDir, n: u64) -> (FlatIndex, ChunkStore) {
        let mut index = FlatIndex::open(8, temp.path().join("vectors.idx")).unwrap();
        let mut store = ChunkStore::load(temp.path().join("chunks.json")).unwrap();
        let ids: Vec<u64> = (0..n).collect();
        let vectors: Vec<Embedding> = (0..n).map(|i| unit_embedding(8, i as usize)).collect();
        index.insert(&ids, &vectors).unwrap();
        store
            .append(
                (0..n)
                    .map(|i| ChunkRecord::new(i, "doc.txt", i as u32 + 1, format!("chunk {i}")))
                    .collect(),
            )
            .unwrap();
        (index, store)
    }

    #[test]
    fn test_in_sync_stores_untouched() {
        let temp = TempDir::new().unwrap();
        let (mut index, mut store) = populated(&temp, 4);

        let stats = reconcile(&mut index, &mut store);
        assert!(!stats.repaired());
        assert_eq!(index.len(), 4);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_extra_index_tail_is_truncated() {
        // Crash between persist calls: index has ids the store lacks.
        let temp = TempDir::new().unwrap();
        let (mut index, mut store) = populated(&temp, 3);
        index
            .insert(&[3, 4], &[unit_embedding(8, 3), unit_embedding(8, 4)])
            .unwrap();

        let stats = reconcile(&mut index, &mut store);
        assert_eq!(stats.vectors_removed, 2);
        assert_eq!(stats.records_removed, 0);
        assert!(in_sync(&index, &store));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_extra_records_are_truncated() {
        let temp = TempDir::new().unwrap();
        let (mut index, mut store) = populated(&temp, 3);
        store
            .append(vec![ChunkRecord::new(3, "doc.txt", 4, "chunk 3")])
            .unwrap();

        let stats = reconcile(&mut index, &mut store);
        assert_eq!(stats.vectors_removed, 0);
        assert_eq!(stats.records_removed, 1);
        assert!(in_sync(&index, &store));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_hole_in_index_truncates_from_hole() {
        let temp = TempDir::new().unwrap();
        let (mut index, mut store) = populated(&temp, 5);
        index.remove(2);

        let stats = reconcile(&mut index, &mut store);
        // Common prefix is 0..2; ids 3 and 4 go too.
        assert_eq!(stats.vectors_removed, 2);
        assert_eq!(stats.records_removed, 3);
        assert!(in_sync(&index, &store));
        assert_eq!(store.len(), 2);
    }
}
