//! # rag-store
//!
//! Chunk metadata store for the RAG store.
//!
//! Holds the ordered, append-only collection of chunk records that
//! parallels the vector index: the record at identifier `i` describes
//! the vector stored under identifier `i`. Persisted as a single
//! pretty-printed JSON document so the store stays human-inspectable.

pub mod chunk_store;
pub mod error;

pub use chunk_store::ChunkStore;
pub use error::StoreError;
