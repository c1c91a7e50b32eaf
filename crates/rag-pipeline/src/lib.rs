//! # rag-pipeline
//!
//! Ingestion and query orchestration for the RAG store.
//!
//! `RagService` is the single owner of the two persisted stores. Each
//! operation loads fresh state, mutates or reads it, and writes it back
//! atomically; nothing stays open across operations. A writer lock
//! serializes ingestions while queries run concurrently against a
//! consistent snapshot.

pub mod extract;
pub mod ingest;
pub mod query;
pub mod recovery;
pub mod service;
pub mod split;

pub use extract::{Extractor, TextExtractor};
pub use ingest::IngestOutcome;
pub use query::{ContextHit, QueryResponse};
pub use recovery::RepairStats;
pub use service::{RagService, StoreStatus};
pub use split::split_text;
