//! # rag-generation
//!
//! Answer generation for the RAG store.
//!
//! The generator is an opaque remote service: question plus ordered
//! context passages in, answer text out. This crate defines the
//! gateway trait, an OpenAI-compatible chat completion implementation,
//! and the degraded-mode answer used when no generator is configured.

pub mod api;
pub mod error;
pub mod gateway;

pub use api::{ApiGenerator, ApiGeneratorConfig};
pub use error::GenerationError;
pub use gateway::{fallback_answer, GenerationGateway, NO_CONTEXT_ANSWER};
