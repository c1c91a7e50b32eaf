//! Flat exact-search index with binary single-file persistence.
//!
//! On-disk layout, little-endian throughout:
//!
//! ```text
//! magic     8 bytes  "RAGVIDX1"
//! version   u32
//! dimension u32
//! count     u64
//! entries   count * (id: u64, values: dimension * f32)
//! ```
//!
//! The layout round-trips vectors byte for byte; identifiers are
//! preserved exactly.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use rag_embeddings::Embedding;

use crate::error::VectorError;
use crate::index::{IndexStats, SearchResult};

const MAGIC: &[u8; 8] = b"RAGVIDX1";
const FORMAT_VERSION: u32 = 1;

/// Exact nearest-neighbor index over normalized vectors.
///
/// Entries are keyed by identifier; identifiers are the only stable
/// reference into the index. Search is an exhaustive inner-product
/// scan with ties broken by ascending identifier.
pub struct FlatIndex {
    dimension: usize,
    path: PathBuf,
    entries: BTreeMap<u64, Vec<f32>>,
}

impl FlatIndex {
    /// Open the index at `path`, bound to `dimension`.
    ///
    /// Loads persisted state when the file exists; otherwise returns an
    /// empty index. Fails with `DimensionMismatch` when a persisted
    /// index has a different dimension - that is a hard stop, not a
    /// migration. A file that exists but cannot be parsed is `Corrupt`,
    /// never silently treated as absent.
    pub fn open(dimension: usize, path: impl Into<PathBuf>) -> Result<Self, VectorError> {
        let path = path.into();

        match Self::load(&path)? {
            Some(index) => {
                if index.dimension != dimension {
                    return Err(VectorError::DimensionMismatch {
                        expected: index.dimension,
                        actual: dimension,
                    });
                }
                Ok(index)
            }
            None => {
                debug!(path = ?path, dim = dimension, "No persisted index, starting empty");
                Ok(Self {
                    dimension,
                    path,
                    entries: BTreeMap::new(),
                })
            }
        }
    }

    /// Load a persisted index taking the dimension from the file.
    ///
    /// Returns `Ok(None)` when no file exists. Used by status and
    /// repair paths that run before any embedding is available.
    pub fn load(path: impl Into<PathBuf>) -> Result<Option<Self>, VectorError> {
        let path = path.into();

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let (dimension, entries) = decode(&bytes)?;

        info!(path = ?path, dim = dimension, vectors = entries.len(), "Loaded vector index");
        Ok(Some(Self {
            dimension,
            path,
            entries,
        }))
    }

    /// Get the embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of live vectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether an identifier exists.
    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Iterate live identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    /// Insert a batch of vectors under explicit identifiers.
    ///
    /// All-or-nothing: every id and vector is validated before any
    /// entry is added, so a failed call leaves the index untouched.
    pub fn insert(&mut self, ids: &[u64], vectors: &[Embedding]) -> Result<(), VectorError> {
        if ids.len() != vectors.len() {
            return Err(VectorError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
            });
        }

        // Validate first; mutate only after everything checks out.
        let mut seen = std::collections::HashSet::with_capacity(ids.len());
        for (id, vector) in ids.iter().zip(vectors.iter()) {
            if vector.dimension() != self.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.dimension(),
                });
            }
            if self.entries.contains_key(id) || !seen.insert(*id) {
                return Err(VectorError::IdExists(*id));
            }
        }

        for (id, vector) in ids.iter().zip(vectors.iter()) {
            self.entries.insert(*id, vector.values.clone());
        }

        debug!(added = ids.len(), total = self.entries.len(), "Inserted vectors");
        Ok(())
    }

    /// Search for the top-k most similar vectors.
    ///
    /// Exhaustive inner-product scan. Returns up to `k` results in
    /// descending score order; when fewer than `k` vectors are live,
    /// returns all of them. Ties break by ascending identifier so
    /// results are reproducible.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        if query.dimension() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|(&id, values)| {
                let score: f32 = values
                    .iter()
                    .zip(query.values.iter())
                    .map(|(a, b)| a * b)
                    .sum();
                SearchResult::new(id, score)
            })
            .collect();

        // BTreeMap iteration is id-ascending, and the sort is stable,
        // so equal scores keep ascending-id order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(k = k, found = scored.len(), "Search complete");
        Ok(scored)
    }

    /// Remove a vector by identifier. Returns whether it was present.
    pub fn remove(&mut self, id: u64) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            debug!(id = id, "Removed vector");
        }
        removed
    }

    /// Remove every identifier at or above `first_id`.
    /// Returns the number of removed entries. Used by the repair path
    /// when the index holds identifiers the chunk store has no record
    /// for.
    pub fn truncate_from(&mut self, first_id: u64) -> usize {
        let doomed: Vec<u64> = self.entries.range(first_id..).map(|(&id, _)| id).collect();
        for id in &doomed {
            self.entries.remove(id);
        }
        if !doomed.is_empty() {
            info!(first_id = first_id, removed = doomed.len(), "Truncated index tail");
        }
        doomed.len()
    }

    /// Get index statistics.
    pub fn stats(&self) -> IndexStats {
        let size_bytes = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        IndexStats {
            vector_count: self.entries.len(),
            dimension: self.dimension,
            size_bytes,
        }
    }

    /// Persist the full entry set to the backing file.
    ///
    /// Writes to `<path>.tmp`, syncs, then renames over the real file
    /// so a crash mid-write never leaves a corrupt index visible.
    pub fn persist(&self) -> Result<(), VectorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = tmp_path(&self.path);
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&encode(self.dimension, &self.entries))?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        info!(path = ?self.path, vectors = self.entries.len(), "Persisted vector index");
        Ok(())
    }

    /// Delete the persisted file, if any. Any leftover temp file from a
    /// crashed persist is removed as well.
    pub fn delete_file(path: impl AsRef<Path>) -> Result<(), VectorError> {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }
        if path.exists() {
            fs::remove_file(path)?;
            info!(path = ?path, "Deleted vector index file");
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

fn encode(dimension: usize, entries: &BTreeMap<u64, Vec<f32>>) -> Vec<u8> {
    let mut buf =
        Vec::with_capacity(24 + entries.len() * (8 + dimension * 4));
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(dimension as u32).to_le_bytes());
    buf.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for (id, values) in entries {
        buf.extend_from_slice(&id.to_le_bytes());
        for v in values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    buf
}

fn decode(bytes: &[u8]) -> Result<(usize, BTreeMap<u64, Vec<f32>>), VectorError> {
    let mut reader = Reader { bytes, pos: 0 };

    let magic = reader.take(8)?;
    if magic != MAGIC {
        return Err(VectorError::Corrupt("bad magic bytes".to_string()));
    }
    let version = reader.u32()?;
    if version != FORMAT_VERSION {
        return Err(VectorError::Corrupt(format!(
            "unsupported format version {version}"
        )));
    }
    let dimension = reader.u32()? as usize;
    let count = reader.u64()? as usize;

    let mut entries = BTreeMap::new();
    for _ in 0..count {
        let id = reader.u64()?;
        let mut values = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            values.push(reader.f32()?);
        }
        if entries.insert(id, values).is_some() {
            return Err(VectorError::Corrupt(format!("duplicate identifier {id}")));
        }
    }
    if reader.pos != bytes.len() {
        return Err(VectorError::Corrupt("trailing bytes after entries".to_string()));
    }

    Ok((dimension, entries))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], VectorError> {
        if self.pos + n > self.bytes.len() {
            return Err(VectorError::Corrupt("unexpected end of file".to_string()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, VectorError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, VectorError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32, VectorError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn random_embedding(dim: usize) -> Embedding {
        use rand::Rng;
        let mut rng = rand::rng();
        let values: Vec<f32> = (0..dim).map(|_| rng.random()).collect();
        Embedding::new(values)
    }

    fn index_path(temp: &TempDir) -> PathBuf {
        temp.path().join("vectors.idx")
    }

    #[test]
    fn test_open_empty() {
        let temp = TempDir::new().unwrap();
        let index = FlatIndex::open(64, index_path(&temp)).unwrap();
        assert_eq!(index.dimension(), 64);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let temp = TempDir::new().unwrap();
        let mut index = FlatIndex::open(64, index_path(&temp)).unwrap();

        let vectors: Vec<Embedding> = (0..10).map(|_| random_embedding(64)).collect();
        let ids: Vec<u64> = (0..10).collect();
        index.insert(&ids, &vectors).unwrap();
        assert_eq!(index.len(), 10);

        let results = index.search(&random_embedding(64), 5).unwrap();
        assert_eq!(results.len(), 5);
        for i in 1..results.len() {
            assert!(results[i - 1].score >= results[i].score);
        }
    }

    #[test]
    fn test_round_trip_top1_is_self() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);

        let vectors: Vec<Embedding> = (0..20).map(|_| random_embedding(32)).collect();
        let ids: Vec<u64> = (0..20).collect();
        {
            let mut index = FlatIndex::open(32, &path).unwrap();
            index.insert(&ids, &vectors).unwrap();
            index.persist().unwrap();
        }

        let index = FlatIndex::open(32, &path).unwrap();
        assert_eq!(index.len(), 20);

        // Searching with an original vector returns its own id as the
        // top hit with similarity ~1.0.
        let results = index.search(&vectors[7], 3).unwrap();
        assert_eq!(results[0].id, 7);
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_persisted_vectors_round_trip_exactly() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);

        let emb = random_embedding(16);
        {
            let mut index = FlatIndex::open(16, &path).unwrap();
            index.insert(&[42], std::slice::from_ref(&emb)).unwrap();
            index.persist().unwrap();
        }

        let index = FlatIndex::open(16, &path).unwrap();
        assert_eq!(index.entries.get(&42).unwrap(), &emb.values);
    }

    #[test]
    fn test_dimension_guard_on_open() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);

        {
            let mut index = FlatIndex::open(64, &path).unwrap();
            index.insert(&[0], &[random_embedding(64)]).unwrap();
            index.persist().unwrap();
        }

        let result = FlatIndex::open(128, &path);
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch { expected: 64, actual: 128 })
        ));
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let temp = TempDir::new().unwrap();
        let mut index = FlatIndex::open(64, index_path(&temp)).unwrap();
        let result = index.insert(&[0], &[random_embedding(32)]);
        assert!(matches!(result, Err(VectorError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let temp = TempDir::new().unwrap();
        let mut index = FlatIndex::open(8, index_path(&temp)).unwrap();
        index.insert(&[1], &[random_embedding(8)]).unwrap();

        let result = index.insert(&[1], &[random_embedding(8)]);
        assert!(matches!(result, Err(VectorError::IdExists(1))));
    }

    #[test]
    fn test_failed_batch_leaves_index_untouched() {
        let temp = TempDir::new().unwrap();
        let mut index = FlatIndex::open(8, index_path(&temp)).unwrap();
        index.insert(&[0], &[random_embedding(8)]).unwrap();

        // Second entry collides; the first must not land either.
        let result = index.insert(&[5, 0], &[random_embedding(8), random_embedding(8)]);
        assert!(matches!(result, Err(VectorError::IdExists(0))));
        assert_eq!(index.len(), 1);
        assert!(!index.contains(5));
    }

    #[test]
    fn test_top_k_larger_than_index() {
        let temp = TempDir::new().unwrap();
        let mut index = FlatIndex::open(8, index_path(&temp)).unwrap();
        let ids: Vec<u64> = (0..3).collect();
        let vectors: Vec<Embedding> = (0..3).map(|_| random_embedding(8)).collect();
        index.insert(&ids, &vectors).unwrap();

        let results = index.search(&random_embedding(8), 10).unwrap();
        assert_eq!(results.len(), 3);
        let mut seen: Vec<u64> = results.iter().map(|r| r.id).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_empty_index() {
        let temp = TempDir::new().unwrap();
        let index = FlatIndex::open(8, index_path(&temp)).unwrap();
        let results = index.search(&random_embedding(8), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_tie_break_by_ascending_id() {
        let temp = TempDir::new().unwrap();
        let mut index = FlatIndex::open(2, index_path(&temp)).unwrap();

        // Two identical vectors score identically against any query.
        let emb = Embedding::new(vec![1.0, 0.0]);
        index.insert(&[9, 4], &[emb.clone(), emb.clone()]).unwrap();

        let results = index.search(&emb, 2).unwrap();
        assert_eq!(results[0].id, 4);
        assert_eq!(results[1].id, 9);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);
        fs::write(&path, b"definitely not an index").unwrap();

        let result = FlatIndex::open(8, &path);
        assert!(matches!(result, Err(VectorError::Corrupt(_))));
    }

    #[test]
    fn test_truncated_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);

        {
            let mut index = FlatIndex::open(8, &path).unwrap();
            let ids: Vec<u64> = (0..4).collect();
            let vectors: Vec<Embedding> = (0..4).map(|_| random_embedding(8)).collect();
            index.insert(&ids, &vectors).unwrap();
            index.persist().unwrap();
        }

        // Chop the tail off; the count in the header no longer matches.
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

        let result = FlatIndex::open(8, &path);
        assert!(matches!(result, Err(VectorError::Corrupt(_))));
    }

    #[test]
    fn test_persist_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);

        let mut index = FlatIndex::open(8, &path).unwrap();
        index.insert(&[0], &[random_embedding(8)]).unwrap();
        index.persist().unwrap();

        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_remove_and_truncate() {
        let temp = TempDir::new().unwrap();
        let mut index = FlatIndex::open(8, index_path(&temp)).unwrap();
        let ids: Vec<u64> = (0..6).collect();
        let vectors: Vec<Embedding> = (0..6).map(|_| random_embedding(8)).collect();
        index.insert(&ids, &vectors).unwrap();

        assert!(index.remove(2));
        assert!(!index.remove(2));
        assert_eq!(index.len(), 5);

        let removed = index.truncate_from(4);
        assert_eq!(removed, 2);
        let remaining: Vec<u64> = index.ids().collect();
        assert_eq!(remaining, vec![0, 1, 3]);
    }

    #[test]
    fn test_load_takes_dimension_from_file() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);
        assert!(FlatIndex::load(&path).unwrap().is_none());

        {
            let mut index = FlatIndex::open(16, &path).unwrap();
            index.insert(&[0], &[random_embedding(16)]).unwrap();
            index.persist().unwrap();
        }

        let index = FlatIndex::load(&path).unwrap().unwrap();
        assert_eq!(index.dimension(), 16);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_delete_file() {
        let temp = TempDir::new().unwrap();
        let path = index_path(&temp);

        let mut index = FlatIndex::open(8, &path).unwrap();
        index.insert(&[0], &[random_embedding(8)]).unwrap();
        index.persist().unwrap();
        assert!(path.exists());

        FlatIndex::delete_file(&path).unwrap();
        assert!(!path.exists());

        // Deleting an absent file is fine.
        FlatIndex::delete_file(&path).unwrap();
    }
}
