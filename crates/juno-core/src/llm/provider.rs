//! LlmProvider trait definition.
//!
//! The core abstraction every chat-completion backend implements. Only
//! streaming is modelled: every conversation in Juno is streamed so partial
//! output can be surfaced as it arrives.

use std::pin::Pin;

use futures_util::Stream;

use juno_types::llm::{CompletionRequest, LlmError, StreamEvent};

/// Stream of decoded events for one completion request.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for chat-completion backends.
///
/// Implementations live in juno-infra (e.g., `OpenAiProvider`). Dropping the
/// returned stream must abandon the underlying request.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// Transport and HTTP failures surface as `Err` items; frames the decoder
    /// cannot interpret surface as `StreamEvent::Malformed`.
    fn stream(&self, request: CompletionRequest) -> EventStream;
}
