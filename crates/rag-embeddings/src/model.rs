//! Embedding value type and gateway trait.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Vector embedding - a normalized float array.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector (normalized to unit length)
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Create embedding without normalization (for pre-normalized vectors)
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Compute cosine similarity with another embedding.
    /// Returns value in [-1, 1] range (1 = identical).
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        // Since both are normalized, dot product = cosine similarity
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }
}

/// Trait for embedding gateways.
///
/// Contract: one row per input text, in input order, each row
/// L2-normalized; an empty input returns an empty vector without
/// calling the backing service.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Generate embeddings for a batch of texts.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut rows = self.embed_texts(&[text.to_string()]).await?;
        rows.pop().ok_or(EmbeddingError::EmptyResponse)
    }
}
