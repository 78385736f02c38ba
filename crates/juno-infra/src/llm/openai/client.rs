//! OpenAiProvider -- [`LlmProvider`] for OpenAI-compatible chat endpoints.
//!
//! Every completion is streamed: the request is posted with `stream: true`
//! and the SSE body is decoded incrementally by [`SseDecoder`]. The API key
//! is held as a [`SecretString`] and only exposed when building the
//! `Authorization` header.

use std::time::Duration;

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use juno_core::llm::provider::{EventStream, LlmProvider};
use juno_types::llm::{CompletionRequest, LlmError};

use super::decoder::SseDecoder;
use super::status_error;
use super::types::{ChatRequest, error_message};

/// Chat-completions client.
///
/// Does not derive Debug so the key can never end up in a log line.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiProvider {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let client = self.client.clone();
        let url = self.url("/chat/completions");
        let api_key = self.api_key.expose_secret().to_string();

        Box::pin(async_stream::try_stream! {
            let body = ChatRequest::from_request(&request);
            debug!(model = %request.model, messages = request.messages.len(), functions = request.functions.len(), "sending completion request");

            let response = client
                .post(&url)
                .bearer_auth(&api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::Provider {
                    message: format!("HTTP request failed: {e}"),
                })?;

            let status = response.status();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %error_body, "completion request rejected");
                Err(status_error(status, error_message(&error_body)))?;
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk.map_err(|e| LlmError::Stream(format!("response body read: {e}")))?;
                for event in decoder.push(&chunk) {
                    yield event;
                }
                if decoder.is_done() {
                    break;
                }
            }

            for event in decoder.finish() {
                yield event;
            }
        })
    }
}
