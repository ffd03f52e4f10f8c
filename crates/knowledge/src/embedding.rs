//! Text embedding providers.
//!
//! The knowledge store only needs one capability from a language-model
//! provider: turn text into a fixed-length vector. [`OllamaEmbeddingClient`]
//! implements it against Ollama's embeddings API.

use aiops_core::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::json;
use tracing::debug;

/// Errors raised by an embedding provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The service could not be reached
    #[error("embedding service unreachable: {0}")]
    Unreachable(String),

    /// The service answered with an error, e.g. the model is not pulled
    #[error("embedding model error (status {status}): {message}")]
    Model {
        /// HTTP status
        status: u16,
        /// Response body
        message: String,
    },

    /// The response could not be understood
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Name of the model producing the vectors.
    fn model(&self) -> &str;
}

/// Ollama Embedding Client.
#[derive(Clone)]
pub struct OllamaEmbeddingClient {
    /// HTTP client
    client: Client,

    /// Provider configuration
    config: EmbeddingConfig,
}

impl OllamaEmbeddingClient {
    /// Create a new Ollama embedding client.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Check if Ollama server is available.
    pub async fn health_check(&self) -> bool {
        match self.client.get(self.endpoint("/api/version")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let payload = json!({
            "model": self.config.model,
            "prompt": text,
            "options": self.config.options,
        });

        debug!("Generating embedding for text ({} chars)", text.len());

        let response = self
            .client
            .post(self.endpoint("/api/embeddings"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Model { status, message });
        }

        #[derive(serde::Deserialize)]
        struct Response {
            embedding: Vec<f32>,
        }

        let response_data: Response = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(response_data.embedding)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> EmbeddingConfig {
        EmbeddingConfig {
            url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OllamaEmbeddingClient::new(EmbeddingConfig {
            url: "http://localhost:11434/".to_string(),
            ..EmbeddingConfig::default()
        });
        assert_eq!(client.endpoint("/api/embeddings"), "http://localhost:11434/api/embeddings");
        assert_eq!(client.model(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let client = OllamaEmbeddingClient::new(unreachable_config());
        let err = client.embed("init").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unreachable(_)));
        assert!(!client.health_check().await);
    }
}
