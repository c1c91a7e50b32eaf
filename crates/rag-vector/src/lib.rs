//! # rag-vector
//!
//! Exact nearest-neighbor vector index for the RAG store.
//!
//! Vectors are stored L2-normalized, so inner product equals cosine
//! similarity. Search is an exhaustive scan with partial top-k
//! selection: at the scale this store targets (thousands to low
//! millions of vectors) exact search is both correct and fast enough,
//! and it avoids the tuning burden of approximate structures.
//!
//! The whole index persists to one binary file; writes go through a
//! temp file and an atomic rename so a crash mid-write never leaves a
//! half-written index behind.

pub mod error;
pub mod flat;
pub mod index;

pub use error::VectorError;
pub use flat::FlatIndex;
pub use index::{IndexStats, SearchResult};
