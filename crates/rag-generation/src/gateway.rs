//! Generation gateway trait and degraded-mode answers.

use async_trait::async_trait;

use crate::error::GenerationError;

/// Fixed answer returned when retrieval produced no usable contexts.
pub const NO_CONTEXT_ANSWER: &str = "No relevant context found for this question.";

/// Trait for answer generators.
///
/// Implementations receive the question and the retrieved context
/// passages in descending relevance order.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generate an answer grounded in the given contexts.
    async fn generate(&self, question: &str, contexts: &[String])
        -> Result<String, GenerationError>;
}

/// Degraded-mode answer used when no generator is configured.
///
/// Not an error: the retrieved contexts are returned verbatim with an
/// explanatory prefix so the caller still gets grounded material.
pub fn fallback_answer(contexts: &[String]) -> String {
    let context_block = contexts
        .iter()
        .map(|ctx| format!("- {ctx}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Generation model not configured. Relevant context:\n{context_block}\n\n\
         Set a generator API key to enable model answers."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_answer_lists_contexts() {
        let contexts = vec!["first passage".to_string(), "second passage".to_string()];
        let answer = fallback_answer(&contexts);
        assert!(answer.contains("- first passage"));
        assert!(answer.contains("- second passage"));
        assert!(answer.starts_with("Generation model not configured"));
    }
}
