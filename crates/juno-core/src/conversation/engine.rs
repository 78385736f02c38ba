//! Streaming conversation engine.
//!
//! `ConversationEngine` drives one streaming completion to exhaustion: it
//! sends the history through the provider, accumulates text deltas and
//! function-call fragments, and reports progress to a
//! [`ConversationObserver`]. OTel GenAI spans instrument every request.

use std::collections::BTreeMap;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use juno_types::error::ConversationError;
use juno_types::llm::{CompletionRequest, FinishReason, LlmError, Message, StreamEvent};
use juno_types::tool::{FunctionCallIntent, ToolDescriptor};

use crate::llm::box_provider::BoxLlmProvider;

/// Per-request settings for [`ConversationEngine::run`].
#[derive(Debug, Clone)]
pub struct ConversationOptions {
    pub model: String,
    pub temperature: Option<f64>,
    /// Functions advertised to the model; empty disables function calling.
    pub functions: Vec<ToolDescriptor>,
}

impl ConversationOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            functions: Vec::new(),
        }
    }
}

/// Lifecycle callbacks for one streamed response.
///
/// All methods default to no-ops so observers only implement what they
/// present. Callbacks run on the conversation task in stream order.
pub trait ConversationObserver: Send + Sync {
    /// The first text delta arrived.
    fn on_start(&self) {}

    /// A new text delta.
    fn on_chunk(&self, _delta: &str) {}

    /// The full text accumulated so far, after each delta.
    fn on_update(&self, _text: &str) {}

    /// The stream finished; `text` is the final accumulated text.
    fn on_end(&self, _text: &str) {}

    /// A non-fatal problem, such as a malformed frame. The run continues.
    fn on_error(&self, _error: &LlmError) {}

    /// Progress text for a tool that is about to run.
    fn on_function_call(&self, _description: &str) {}
}

/// Observer that ignores every callback.
pub struct NoopObserver;

impl ConversationObserver for NoopObserver {}

/// Result of one streamed completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Function calls the model requested, in index order.
    pub function_calls: Vec<FunctionCallIntent>,
    pub finish_reason: Option<FinishReason>,
    /// Frames that could not be decoded and were skipped.
    pub malformed_frames: usize,
}

#[derive(Default)]
struct CallAccumulator {
    name: String,
    arguments: String,
}

/// Executes streamed completions.
#[derive(Debug, Clone)]
pub struct ConversationEngine {
    provider: BoxLlmProvider,
}

impl ConversationEngine {
    /// Create a new conversation engine with the given LLM provider.
    pub fn new(provider: BoxLlmProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &BoxLlmProvider {
        &self.provider
    }

    /// Stream one completion for `history` and return the final text.
    ///
    /// `history` is not modified; appending the reply is the caller's job.
    /// Malformed frames are reported through `on_error` and skipped. A
    /// transport failure or an error frame from the provider ends the run
    /// with `ConversationError::Llm`, and
    /// cancelling `cancel` drops the in-flight request and returns
    /// `ConversationError::Cancelled`.
    pub async fn run(
        &self,
        history: &[Message],
        options: &ConversationOptions,
        observer: &dyn ConversationObserver,
        cancel: &CancellationToken,
    ) -> Result<Completion, ConversationError> {
        let mut request = CompletionRequest::new(options.model.clone(), history.to_vec());
        request.temperature = options.temperature;
        request.functions = options.functions.clone();

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.functions = request.functions.len(),
            gen_ai.request.messages = request.messages.len(),
        );

        self.drive(request, observer, cancel).instrument(span).await
    }

    async fn drive(
        &self,
        request: CompletionRequest,
        observer: &dyn ConversationObserver,
        cancel: &CancellationToken,
    ) -> Result<Completion, ConversationError> {
        let mut stream = self.provider.stream(request);

        // Local to this invocation; concurrent runs never share a buffer.
        let mut text = String::new();
        let mut started = false;
        let mut calls: BTreeMap<u32, CallAccumulator> = BTreeMap::new();
        let mut finish_reason = None;
        let mut malformed_frames = 0;
        let mut saw_done = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(received = text.len(), "completion cancelled");
                    return Err(ConversationError::Cancelled);
                }
                next = stream.next() => next,
            };

            let Some(event) = next else {
                break;
            };

            match event? {
                StreamEvent::Delta { text: delta } => {
                    if delta.is_empty() {
                        continue;
                    }
                    if !started {
                        started = true;
                        observer.on_start();
                    }
                    text.push_str(&delta);
                    observer.on_chunk(&delta);
                    observer.on_update(&text);
                }
                StreamEvent::FunctionCallDelta {
                    index,
                    name,
                    arguments,
                } => {
                    let acc = calls.entry(index).or_default();
                    if let Some(name) = name.filter(|n| !n.is_empty()) {
                        acc.name = name;
                    }
                    acc.arguments.push_str(&arguments);
                }
                StreamEvent::Finish { reason } => {
                    finish_reason = Some(reason);
                }
                StreamEvent::Done => {
                    saw_done = true;
                    break;
                }
                StreamEvent::Malformed { raw } => {
                    malformed_frames += 1;
                    warn!(raw = %raw, "skipping malformed stream frame");
                    observer.on_error(&LlmError::Deserialization(format!(
                        "malformed stream frame: {raw}"
                    )));
                }
                StreamEvent::Error { message } => {
                    warn!(error = %message, received = text.len(), "provider failed mid-stream");
                    return Err(LlmError::Provider { message }.into());
                }
            }
        }

        if !saw_done {
            warn!("stream ended without [DONE]; treating accumulated text as final");
        }

        let function_calls = calls
            .into_values()
            .filter_map(|acc| {
                if acc.name.is_empty() {
                    warn!(arguments = %acc.arguments, "dropping function call without a name");
                    None
                } else {
                    Some(FunctionCallIntent::new(acc.name, acc.arguments))
                }
            })
            .collect::<Vec<_>>();

        debug!(
            chars = text.len(),
            function_calls = function_calls.len(),
            finish_reason = ?finish_reason,
            "completion finished"
        );
        observer.on_end(&text);

        Ok(Completion {
            text,
            function_calls,
            finish_reason,
            malformed_frames,
        })
    }
}
