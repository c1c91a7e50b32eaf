//! The RAG service: single owner of the joined stores.
//!
//! Every operation is one load -> mutate/read -> persist pass; the
//! stores are never held open across operations. A writer lock
//! serializes mutating operations (two concurrent ingestions would
//! otherwise assign overlapping identifiers), while queries share a
//! read lock and tolerate a slightly stale snapshot.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use rag_embeddings::{EmbeddingError, EmbeddingGateway};
use rag_generation::{fallback_answer, GenerationGateway, NO_CONTEXT_ANSWER};
use rag_store::{ChunkStore, StoreError};
use rag_types::{ChunkRecord, RagError, Settings};
use rag_vector::{FlatIndex, VectorError};

use crate::extract::{Extractor, TextExtractor};
use crate::ingest::IngestOutcome;
use crate::query::{ContextHit, QueryResponse};
use crate::recovery::{self, RepairStats};
use crate::split::split_text;

/// Snapshot of the persisted store state.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    /// Chunk records in the metadata store
    pub chunks: usize,
    /// Live vectors in the index
    pub vectors: usize,
    /// Index dimension, when an index file exists
    pub dimension: Option<usize>,
    /// Whether the two stores agree on the identifier set
    pub in_sync: bool,
}

/// Orchestrates ingestion and query over the vector index and chunk
/// store. Gateways are injected so tests can run with deterministic
/// doubles instead of remote services.
pub struct RagService {
    settings: Settings,
    embedder: Arc<dyn EmbeddingGateway>,
    generator: Option<Arc<dyn GenerationGateway>>,
    extractor: Arc<dyn Extractor>,
    lock: RwLock<()>,
}

impl RagService {
    /// Create a service with the given gateways.
    ///
    /// `generator` may be `None`: queries then answer in degraded mode
    /// with the retrieved contexts verbatim.
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn EmbeddingGateway>,
        generator: Option<Arc<dyn GenerationGateway>>,
    ) -> Result<Self, RagError> {
        settings.validate()?;
        Ok(Self {
            settings,
            embedder,
            generator,
            extractor: Arc::new(TextExtractor),
            lock: RwLock::new(()),
        })
    }

    /// Replace the text extraction collaborator.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The settings this service was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Ingest an uploaded file: validate, keep a copy, extract text,
    /// split into chunks, then run the chunk-level ingestion.
    pub async fn ingest_file(
        &self,
        file_name: &str,
        raw_bytes: &[u8],
    ) -> Result<IngestOutcome, RagError> {
        let extension = extension_of(file_name);
        if !self
            .settings
            .allowed_extensions
            .iter()
            .any(|allowed| allowed == &extension)
        {
            return Err(RagError::InvalidInput(format!(
                "unsupported file type: {extension} (allowed: {})",
                self.settings.allowed_extensions.join(", ")
            )));
        }

        if raw_bytes.len() > self.settings.max_file_size_bytes() {
            return Err(RagError::InvalidInput(format!(
                "file exceeds {} MB limit",
                self.settings.max_file_size_mb
            )));
        }

        self.settings.ensure_directories()?;
        let upload_path = self.settings.upload_dir().join(file_name);
        std::fs::write(&upload_path, raw_bytes)?;

        let text = self.extractor.extract(raw_bytes, &extension)?;
        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument(format!(
                "no readable text found in {file_name}"
            )));
        }

        let chunks = split_text(&text, self.settings.chunk_size, self.settings.chunk_overlap);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(format!(
                "failed to split {file_name} into chunks"
            )));
        }

        self.ingest(file_name, chunks).await
    }

    /// Ingest pre-chunked text under a document name.
    ///
    /// Holds the writer lock for the whole load-mutate-persist
    /// sequence. Identifiers are assigned contiguously from the chunk
    /// store's current length; the index is persisted before the
    /// metadata so a crash between the two leaves only unreferenced
    /// index entries, which the repair pass truncates on a later run.
    pub async fn ingest(
        &self,
        document_name: &str,
        chunks: Vec<String>,
    ) -> Result<IngestOutcome, RagError> {
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(format!(
                "no chunks submitted for {document_name}"
            )));
        }

        let _guard = self.lock.write().await;

        let embeddings = self
            .embedder
            .embed_texts(&chunks)
            .await
            .map_err(embedding_err)?;
        // The gateway contract guarantees one row per input; these are
        // the failure modes of a misbehaving remote service.
        if embeddings.is_empty() {
            return Err(RagError::EmbeddingFailure(
                "embedding gateway returned no vectors".to_string(),
            ));
        }
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingFailure(format!(
                "sent {} chunks, got {} vectors",
                chunks.len(),
                embeddings.len()
            )));
        }

        let dimension = embeddings[0].dimension();
        self.settings.ensure_directories()?;
        let mut index =
            FlatIndex::open(dimension, self.settings.index_path()).map_err(vector_err)?;
        let mut store = ChunkStore::load(self.settings.metadata_path()).map_err(store_err)?;

        let repair = recovery::reconcile(&mut index, &mut store);
        if repair.repaired() {
            warn!(
                vectors_removed = repair.vectors_removed,
                records_removed = repair.records_removed,
                "Repaired diverged stores before ingesting"
            );
        }

        let start_id = store.next_id();
        let ids: Vec<u64> = (0..chunks.len() as u64).map(|i| start_id + i).collect();
        let records: Vec<ChunkRecord> = ids
            .iter()
            .zip(chunks.iter())
            .enumerate()
            .map(|(ordinal, (&id, text))| {
                ChunkRecord::new(id, document_name, ordinal as u32 + 1, text.clone())
            })
            .collect();

        index.insert(&ids, &embeddings).map_err(vector_err)?;
        store.append(records).map_err(store_err)?;

        // Index first. A crash after this point leaves at worst index
        // entries with no metadata behind them, which the repair pass
        // detects and truncates; the reverse order would leave records
        // pointing at vectors that do not exist.
        index.persist().map_err(vector_err)?;
        store.persist().map_err(store_err)?;

        info!(
            document = document_name,
            chunks = chunks.len(),
            total = store.len(),
            "Ingested document"
        );

        Ok(IngestOutcome {
            document: document_name.to_string(),
            chunks_indexed: chunks.len() as u32,
            total_chunks: store.len() as u32,
        })
    }

    /// Answer a question from the store.
    ///
    /// Read-only: takes a read guard so queries run concurrently with
    /// each other, and loads a consistent snapshot of both stores.
    pub async fn query(&self, question: &str) -> Result<QueryResponse, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question is required".to_string()));
        }

        let _guard = self.lock.read().await;

        let store = ChunkStore::load(self.settings.metadata_path()).map_err(store_err)?;
        if store.is_empty() {
            return Err(RagError::EmptyStore(
                "no documents have been ingested yet".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed(question).await.map_err(embedding_err)?;

        let index = FlatIndex::open(query_embedding.dimension(), self.settings.index_path())
            .map_err(vector_err)?;
        // Distinct from the metadata check above: catches a
        // desynchronized store where records exist but vectors do not.
        if index.is_empty() {
            return Err(RagError::EmptyStore(
                "the vector index is empty; ingest documents first".to_string(),
            ));
        }

        let results = index
            .search(&query_embedding, self.settings.top_k)
            .map_err(vector_err)?;

        let mut contexts = Vec::new();
        for result in results {
            // Out-of-range identifiers (including any sentinel value)
            // are skipped rather than failing the read: a desynced
            // store should degrade, not become unqueryable.
            let Some(record) = store.get(result.id) else {
                warn!(id = result.id, "Search returned id with no chunk record; skipping");
                continue;
            };
            contexts.push(ContextHit {
                id: record.id,
                source: record.source.clone(),
                chunk_ordinal: record.chunk_ordinal,
                text: record.text.clone(),
                score: result.score,
            });
        }

        let answer = self.answer(question, &contexts).await?;

        Ok(QueryResponse { answer, contexts })
    }

    async fn answer(&self, question: &str, contexts: &[ContextHit]) -> Result<String, RagError> {
        if contexts.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let texts: Vec<String> = contexts.iter().map(|c| c.text.clone()).collect();
        match &self.generator {
            Some(generator) => generator
                .generate(question, &texts)
                .await
                .map_err(|e| RagError::Generation(e.to_string())),
            None => Ok(fallback_answer(&texts)),
        }
    }

    /// Detect and repair store divergence, persisting the result.
    pub async fn repair(&self) -> Result<RepairStats, RagError> {
        let _guard = self.lock.write().await;

        let Some(mut index) = FlatIndex::load(self.settings.index_path()).map_err(vector_err)?
        else {
            return Ok(RepairStats::default());
        };
        let mut store = ChunkStore::load(self.settings.metadata_path()).map_err(store_err)?;

        let stats = recovery::reconcile(&mut index, &mut store);
        if stats.repaired() {
            index.persist().map_err(vector_err)?;
            store.persist().map_err(store_err)?;
        }
        Ok(stats)
    }

    /// Delete both persisted artifacts together.
    ///
    /// Never deletes one without the other: removing a single store
    /// would desynchronize the identifier spaces on the next load.
    pub async fn reset(&self) -> Result<(), RagError> {
        let _guard = self.lock.write().await;

        FlatIndex::delete_file(self.settings.index_path()).map_err(vector_err)?;
        ChunkStore::delete_file(self.settings.metadata_path()).map_err(store_err)?;
        info!("Reset store: deleted index and metadata");
        Ok(())
    }

    /// Report the persisted store state.
    pub async fn status(&self) -> Result<StoreStatus, RagError> {
        let _guard = self.lock.read().await;

        let store = ChunkStore::load(self.settings.metadata_path()).map_err(store_err)?;
        let index = FlatIndex::load(self.settings.index_path()).map_err(vector_err)?;

        Ok(match index {
            Some(index) => StoreStatus {
                chunks: store.len(),
                vectors: index.len(),
                dimension: Some(index.dimension()),
                in_sync: recovery::in_sync(&index, &store),
            },
            None => StoreStatus {
                chunks: store.len(),
                vectors: 0,
                dimension: None,
                in_sync: store.is_empty(),
            },
        })
    }
}

/// Lowercased extension of a file name, with leading dot.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn vector_err(e: VectorError) -> RagError {
    match e {
        VectorError::DimensionMismatch { expected, actual } => {
            RagError::DimensionMismatch { expected, actual }
        }
        other => RagError::Storage(other.to_string()),
    }
}

fn store_err(e: StoreError) -> RagError {
    match e {
        StoreError::IdentifierGap { expected, actual } => {
            RagError::IdentifierGap { expected, actual }
        }
        other => RagError::Storage(other.to_string()),
    }
}

fn embedding_err(e: EmbeddingError) -> RagError {
    match e {
        EmbeddingError::NotConfigured(msg) => RagError::Config(msg),
        other => RagError::EmbeddingFailure(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("doc.txt"), ".txt");
        assert_eq!(extension_of("notes.MD"), ".md");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("no_extension"), "");
    }

    #[test]
    fn test_error_mapping_preserves_dimension_mismatch() {
        let err = vector_err(VectorError::DimensionMismatch {
            expected: 384,
            actual: 768,
        });
        assert!(matches!(
            err,
            RagError::DimensionMismatch { expected: 384, actual: 768 }
        ));
    }

    #[test]
    fn test_error_mapping_preserves_identifier_gap() {
        let err = store_err(StoreError::IdentifierGap { expected: 3, actual: 7 });
        assert!(matches!(err, RagError::IdentifierGap { expected: 3, actual: 7 }));
    }
}
