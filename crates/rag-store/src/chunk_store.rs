//! Ordered chunk record collection with JSON persistence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use rag_types::ChunkRecord;

use crate::error::StoreError;

/// Append-only chunk metadata store.
///
/// The collection's length is the next identifier to assign:
/// identifiers are 0-based positions of first assignment, monotonically
/// increasing, never reused.
pub struct ChunkStore {
    path: PathBuf,
    records: Vec<ChunkRecord>,
}

impl ChunkStore {
    /// Load the persisted collection, or start empty when no file
    /// exists yet. A file that exists but cannot be parsed is a hard
    /// `Corrupt` error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if !path.exists() {
            debug!(path = ?path, "No persisted metadata, starting empty");
            return Ok(Self {
                path,
                records: Vec::new(),
            });
        }

        let bytes = fs::read(&path)?;
        let records: Vec<ChunkRecord> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Positions double as identifiers; verify on load so a
        // hand-edited file cannot smuggle in a gap.
        for (position, record) in records.iter().enumerate() {
            if record.id != position as u64 {
                return Err(StoreError::Corrupt(format!(
                    "record at position {position} has id {}",
                    record.id
                )));
            }
        }

        info!(path = ?path, records = records.len(), "Loaded chunk store");
        Ok(Self { path, records })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The next identifier an ingestion batch would be assigned.
    pub fn next_id(&self) -> u64 {
        self.records.len() as u64
    }

    /// Look up a record by identifier. Returns `None` when the
    /// identifier falls outside the collection's bounds.
    pub fn get(&self, id: u64) -> Option<&ChunkRecord> {
        self.records.get(id as usize)
    }

    /// All records in identifier order.
    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    /// Append records continuing the identifier sequence.
    ///
    /// Record ids must be exactly `len(), len()+1, ...`; anything else
    /// is an `IdentifierGap` and nothing is appended.
    pub fn append(&mut self, records: Vec<ChunkRecord>) -> Result<(), StoreError> {
        let mut expected = self.next_id();
        for record in &records {
            if record.id != expected {
                return Err(StoreError::IdentifierGap {
                    expected,
                    actual: record.id,
                });
            }
            expected += 1;
        }

        let added = records.len();
        self.records.extend(records);
        debug!(added = added, total = self.records.len(), "Appended chunk records");
        Ok(())
    }

    /// Drop every record at or above `len`. Used by the repair path
    /// when the metadata describes vectors the index does not hold.
    pub fn truncate_to(&mut self, len: usize) {
        if len < self.records.len() {
            info!(from = self.records.len(), to = len, "Truncated chunk store");
            self.records.truncate(len);
        }
    }

    /// Persist the full collection as pretty-printed JSON.
    ///
    /// Writes to `<path>.tmp`, syncs, then renames over the real file.
    pub fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(&self.records)?;

        let tmp = tmp_path(&self.path);
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!(path = ?self.path, records = self.records.len(), "Persisted chunk store");
        Ok(())
    }

    /// Delete the persisted file, if any.
    ///
    /// The orchestration layer must pair this with deleting the vector
    /// index file; removing one store alone desynchronizes the next
    /// load.
    pub fn delete_file(path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }
        if path.exists() {
            fs::remove_file(path)?;
            info!(path = ?path, "Deleted chunk store file");
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_path(temp: &TempDir) -> PathBuf {
        temp.path().join("chunks.json")
    }

    fn record(id: u64) -> ChunkRecord {
        ChunkRecord::new(id, "doc.txt", id as u32 + 1, format!("chunk {id}"))
    }

    #[test]
    fn test_load_empty() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::load(store_path(&temp)).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.next_id(), 0);
    }

    #[test]
    fn test_append_and_persist_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = store_path(&temp);

        {
            let mut store = ChunkStore::load(&path).unwrap();
            store.append(vec![record(0), record(1), record(2)]).unwrap();
            store.persist().unwrap();
        }

        let store = ChunkStore::load(&path).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.next_id(), 3);
        let rec = store.get(1).unwrap();
        assert_eq!(rec.source, "doc.txt");
        assert_eq!(rec.chunk_ordinal, 2);
        assert_eq!(rec.text, "chunk 1");
    }

    #[test]
    fn test_append_rejects_gap() {
        let temp = TempDir::new().unwrap();
        let mut store = ChunkStore::load(store_path(&temp)).unwrap();
        store.append(vec![record(0)]).unwrap();

        let result = store.append(vec![record(2)]);
        assert!(matches!(
            result,
            Err(StoreError::IdentifierGap { expected: 1, actual: 2 })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_rejects_gap_inside_batch() {
        let temp = TempDir::new().unwrap();
        let mut store = ChunkStore::load(store_path(&temp)).unwrap();

        let result = store.append(vec![record(0), record(0)]);
        assert!(matches!(result, Err(StoreError::IdentifierGap { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_out_of_bounds_lookup_is_none() {
        let temp = TempDir::new().unwrap();
        let mut store = ChunkStore::load(store_path(&temp)).unwrap();
        store.append(vec![record(0)]).unwrap();
        assert!(store.get(5).is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = store_path(&temp);
        fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(ChunkStore::load(&path), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_misnumbered_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = store_path(&temp);
        let records = vec![record(0), record(5)];
        fs::write(&path, serde_json::to_vec_pretty(&records).unwrap()).unwrap();

        assert!(matches!(ChunkStore::load(&path), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_persisted_file_is_human_inspectable() {
        let temp = TempDir::new().unwrap();
        let path = store_path(&temp);

        let mut store = ChunkStore::load(&path).unwrap();
        store.append(vec![record(0)]).unwrap();
        store.persist().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        assert!(text.contains("\"source\": \"doc.txt\""));
    }

    #[test]
    fn test_truncate_to() {
        let temp = TempDir::new().unwrap();
        let mut store = ChunkStore::load(store_path(&temp)).unwrap();
        store.append(vec![record(0), record(1), record(2)]).unwrap();

        store.truncate_to(1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.next_id(), 1);

        // Truncating to a larger length is a no-op.
        store.truncate_to(10);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_file() {
        let temp = TempDir::new().unwrap();
        let path = store_path(&temp);

        let mut store = ChunkStore::load(&path).unwrap();
        store.append(vec![record(0)]).unwrap();
        store.persist().unwrap();
        assert!(path.exists());

        ChunkStore::delete_file(&path).unwrap();
        assert!(!path.exists());
        ChunkStore::delete_file(&path).unwrap();
    }
}
