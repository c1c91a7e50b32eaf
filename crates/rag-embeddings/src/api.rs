//! API-based embedding gateway using OpenAI-compatible endpoints.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use rag_types::EmbeddingSettings;

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingGateway};

/// Configuration for the API-based embedding gateway.
#[derive(Debug, Clone)]
pub struct ApiEmbedderConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "text-embedding-3-small")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum retries on failure
    pub max_retries: u32,
}

impl ApiEmbedderConfig {
    /// Create config for an OpenAI-compatible API.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Build from application settings.
    /// Fails when no API key is configured: embeddings have no
    /// degraded mode, unlike generation.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            EmbeddingError::NotConfigured(
                "no embedding API key set (RAG__EMBEDDING__API_KEY)".to_string(),
            )
        })?;
        Ok(Self::new(&settings.base_url, &settings.model, api_key))
    }
}

/// Embedding gateway backed by an OpenAI-compatible `/embeddings`
/// endpoint.
pub struct ApiEmbedder {
    client: Client,
    config: ApiEmbedderConfig,
}

impl ApiEmbedder {
    /// Create a new API embedder.
    pub fn new(config: ApiEmbedderConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::NotConfigured(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Call the API with retry logic.
    async fn call_api(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, texts = texts.len(), "Calling embedding API");

            match self.make_request(texts).await {
                Ok(rows) => return Ok(rows),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Embedding API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Make a single API request.
    async fn make_request(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingRow>,
        }

        #[derive(Deserialize)]
        struct EmbeddingRow {
            index: usize,
            embedding: Vec<f32>,
        }

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        };

        let url = format!("{}/embeddings", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Api(e.to_string()))?;

        if response.status() == 429 {
            return Err(EmbeddingError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("HTTP {}: {}", status, body)));
        }

        let response_body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        // The API is documented to preserve input order, but rows carry
        // an index; sort to make order explicit.
        let mut rows = response_body.data;
        rows.sort_by_key(|r| r.index);

        Ok(rows
            .into_iter()
            .map(|r| Embedding::new(r.embedding))
            .collect())
    }
}

#[async_trait]
impl EmbeddingGateway for ApiEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.call_api(texts).await?;

        if rows.is_empty() {
            return Err(EmbeddingError::EmptyResponse);
        }
        if rows.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: rows.len(),
            });
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings_requires_key() {
        let settings = EmbeddingSettings::default();
        assert!(matches!(
            ApiEmbedderConfig::from_settings(&settings),
            Err(EmbeddingError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_config_from_settings_with_key() {
        let settings = EmbeddingSettings {
            api_key: Some("test-key".to_string()),
            ..EmbeddingSettings::default()
        };
        let config = ApiEmbedderConfig::from_settings(&settings).unwrap();
        assert!(config.base_url.contains("openai"));
        assert_eq!(config.model, "text-embedding-3-small");
    }
}
