//! Text extraction collaborator.
//!
//! Extraction is a seam, not a core concern: the built-in extractor
//! handles UTF-8 text formats, and richer formats plug in behind the
//! trait without touching the pipelines.

use rag_types::RagError;

/// Trait for turning raw uploaded bytes into text.
pub trait Extractor: Send + Sync {
    /// Extract text from `raw_bytes`, guided by the file extension
    /// (lowercase, with leading dot, e.g. ".txt").
    fn extract(&self, raw_bytes: &[u8], extension: &str) -> Result<String, RagError>;
}

/// Extractor for plain UTF-8 text formats.
///
/// Invalid byte sequences are dropped rather than failing the upload;
/// a document that decodes to nothing is rejected downstream as an
/// empty document.
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn extract(&self, raw_bytes: &[u8], extension: &str) -> Result<String, RagError> {
        match extension {
            ".txt" | ".md" => Ok(String::from_utf8_lossy(raw_bytes).into_owned()),
            other => Err(RagError::InvalidInput(format!(
                "no extractor for file type: {other}"
            ))),
        }
    }
}
