//! # rag-types
//!
//! Shared types for the RAG store workspace.
//!
//! This crate defines the chunk record that joins the vector index and
//! the chunk store, the unified error taxonomy surfaced to callers, and
//! the layered configuration all components read from.

pub mod chunk;
pub mod config;
pub mod error;

pub use chunk::ChunkRecord;
pub use config::{EmbeddingSettings, GeneratorSettings, Settings};
pub use error::RagError;
