//! BoxLlmProvider -- shared, type-erased handle to an LlmProvider.
//!
//! The conversation engine and the function-call loop hold the same provider,
//! so the handle is reference counted and cheap to clone.

use std::sync::Arc;

use juno_types::llm::CompletionRequest;

use super::provider::{EventStream, LlmProvider};

/// Type-erased LLM provider for runtime provider selection.
#[derive(Clone)]
pub struct BoxLlmProvider {
    inner: Arc<dyn LlmProvider>,
}

impl BoxLlmProvider {
    /// Wrap a concrete `LlmProvider`.
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send a streaming completion request. Returns a stream of events.
    pub fn stream(&self, request: CompletionRequest) -> EventStream {
        self.inner.stream(request)
    }
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxLlmProvider")
            .field("name", &self.inner.name())
            .finish()
    }
}
