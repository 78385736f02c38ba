//! [`Embedder`] backed by an OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use juno_core::index::Embedder;
use juno_types::config::EmbeddingConfig;
use juno_types::index::EmbeddingError;

use crate::llm::openai::types::{EmbeddingRequest, EmbeddingResponse, error_message};

/// Remote embedding model.
///
/// Like the chat provider, deliberately without a Debug impl.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    url: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: SecretString,
        base_url: &str,
        config: &EmbeddingConfig,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| EmbeddingError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    /// Reorder the response by `index` and check it covers every input.
    fn into_vectors(
        &self,
        response: EmbeddingResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if response.data.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {expected} embeddings, got {}",
                response.data.len()
            )));
        }

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
        for item in response.data {
            if item.embedding.len() != self.dimension {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "embedding has {} dimensions, {} configured",
                    item.embedding.len(),
                    self.dimension
                )));
            }
            let slot = slots.get_mut(item.index).ok_or_else(|| {
                EmbeddingError::InvalidResponse(format!("embedding index {} out of range", item.index))
            })?;
            *slot = Some(item.embedding);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| EmbeddingError::InvalidResponse(format!("no embedding for input {i}")))
            })
            .collect()
    }
}

impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %error_body, "embedding request rejected");
            return Err(match status.as_u16() {
                401 => EmbeddingError::AuthenticationFailed,
                429 => EmbeddingError::RateLimited,
                _ => EmbeddingError::Request(format!("HTTP {status}: {}", error_message(&error_body))),
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("failed to parse response: {e}")))?;
        debug!(inputs = texts.len(), model = %self.model, "embedded texts");
        self.into_vectors(parsed, texts.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
