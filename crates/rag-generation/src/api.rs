//! API-based answer generator using OpenAI-compatible endpoints.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use rag_types::GeneratorSettings;

use crate::error::GenerationError;
use crate::gateway::GenerationGateway;

/// Configuration for the API-based generator.
#[derive(Debug, Clone)]
pub struct ApiGeneratorConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum retries on failure
    pub max_retries: u32,
}

impl ApiGeneratorConfig {
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

    /// Build from application settings. Returns `None` when no API key
    /// is configured, which selects degraded mode rather than failing.
    pub fn from_settings(settings: &GeneratorSettings) -> Option<Self> {
        settings
            .api_key
            .clone()
            .map(|key| Self::new(&settings.base_url, &settings.model, key))
    }
}

/// Answer generator backed by an OpenAI-compatible chat completions
/// endpoint.
pub struct ApiGenerator {
    client: Client,
    config: ApiGeneratorConfig,
}

impl ApiGenerator {
    /// Create a new API generator.
    pub fn new(config: ApiGeneratorConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::NotConfigured(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build the user prompt from the question and context passages.
    fn build_prompt(question: &str, contexts: &[String]) -> String {
        let context_block = contexts
            .iter()
            .map(|ctx| format!("- {ctx}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("Context:\n{context_block}\n\nQuestion: {question}")
    }

    /// Call the API with retry logic.
    async fn call_api(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Calling generation API");

            match self.make_request(prompt).await {
                Ok(response) => return Ok(response),
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
                                "Generation API call failed, retrying"
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
    async fn make_request(&self, prompt: &str) -> Result<String, GenerationError> {
        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
        }

        #[derive(Serialize)]
        struct ChatMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessageResponse,
        }

        #[derive(Deserialize)]
        struct ChatMessageResponse {
            content: String,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a concise assistant that answers using only the provided context."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.1,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

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
            .map_err(|e| GenerationError::Api(e.to_string()))?;

        if response.status() == 429 {
            return Err(GenerationError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!("HTTP {}: {}", status, body)));
        }

        let response_body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        response_body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| GenerationError::Parse("No choices in response".to_string()))
    }
}

#[async_trait]
impl GenerationGateway for ApiGenerator {
    async fn generate(
        &self,
        question: &str,
        contexts: &[String],
    ) -> Result<String, GenerationError> {
        let prompt = Self::build_prompt(question, contexts);
        self.call_api(&prompt).await
    }
}
