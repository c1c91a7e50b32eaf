//! # rag-embeddings
//!
//! Embedding generation for the RAG store.
//!
//! The embedding model is an opaque remote service: text in,
//! L2-normalized fixed-dimension vector out. This crate defines the
//! gateway trait the pipelines depend on (so tests can inject
//! deterministic doubles) and an OpenAI-compatible HTTP implementation.

pub mod api;
pub mod error;
pub mod model;

pub use api::{ApiEmbedder, ApiEmbedderConfig};
pub use error::EmbeddingError;
pub use model::{Embedding, EmbeddingGateway};
