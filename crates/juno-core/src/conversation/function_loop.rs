//! Function-call loop.
//!
//! Alternates completion requests and tool executions until the model gives
//! a final answer:
//!
//! ```text
//! AwaitingCompletion --(no calls)--> FinalAnswer
//! AwaitingCompletion --(calls)-----> ToolCallRequested --> ToolExecuted --> AwaitingCompletion
//! ```
//!
//! Every completion request counts as one round trip; once `max_round_trips`
//! requests have been made without a final answer the loop fails with
//! `LoopError::RoundTripLimit`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use juno_types::error::{ConversationError, LoopError};
use juno_types::llm::{
    FUNCTION_CALLING_MODEL, FUNCTION_CALLING_TEMPERATURE, FinishReason, FunctionCall, Message,
};
use juno_types::tool::FunctionCallIntent;

use super::engine::{ConversationEngine, ConversationObserver, ConversationOptions};
use crate::tools::ToolRegistry;

/// Settings for a [`FunctionCallLoop`].
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_round_trips: usize,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            model: FUNCTION_CALLING_MODEL.to_string(),
            temperature: Some(FUNCTION_CALLING_TEMPERATURE),
            max_round_trips: 5,
        }
    }
}

/// Where the loop is.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingCompletion,
    ToolCallRequested {
        /// Text the model produced alongside the calls, if any.
        text: String,
        intents: Vec<FunctionCallIntent>,
    },
    ToolExecuted,
    FinalAnswer(String),
}

/// A finished loop.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub answer: String,
    /// The full dialogue, including function requests, results and the answer.
    pub history: Vec<Message>,
    pub round_trips: usize,
}

/// Drives completions and tool executions until a final answer.
pub struct FunctionCallLoop {
    engine: ConversationEngine,
    registry: Arc<ToolRegistry>,
    options: LoopOptions,
}

impl FunctionCallLoop {
    pub fn new(engine: ConversationEngine, registry: Arc<ToolRegistry>, options: LoopOptions) -> Self {
        Self {
            engine,
            registry,
            options,
        }
    }

    /// Seed the dialogue with a system and a user message, then run it.
    pub async fn run_prompt(
        &self,
        system: &str,
        user: &str,
        observer: &dyn ConversationObserver,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, LoopError> {
        self.run(
            vec![Message::system(system), Message::user(user)],
            observer,
            cancel,
        )
        .await
    }

    /// Continue a caller-supplied history until the model answers.
    pub async fn run(
        &self,
        mut history: Vec<Message>,
        observer: &dyn ConversationObserver,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, LoopError> {
        let options = ConversationOptions {
            model: self.options.model.clone(),
            temperature: self.options.temperature,
            functions: self.registry.descriptors(),
        };

        let mut state = LoopState::AwaitingCompletion;
        let mut round_trips = 0;

        loop {
            state = match state {
                LoopState::AwaitingCompletion => {
                    if round_trips >= self.options.max_round_trips {
                        warn!(limit = self.options.max_round_trips, "function-call loop hit its round-trip limit");
                        return Err(LoopError::RoundTripLimit {
                            limit: self.options.max_round_trips,
                        });
                    }
                    round_trips += 1;

                    let completion = self.engine.run(&history, &options, observer, cancel).await?;
                    if completion.function_calls.is_empty() {
                        if completion.finish_reason == Some(FinishReason::Length) {
                            warn!("final answer was truncated by the model's length limit");
                        }
                        LoopState::FinalAnswer(completion.text)
                    } else {
                        debug!(
                            round_trip = round_trips,
                            calls = completion.function_calls.len(),
                            "model requested function calls"
                        );
                        LoopState::ToolCallRequested {
                            text: completion.text,
                            intents: completion.function_calls,
                        }
                    }
                }

                LoopState::ToolCallRequested { text, intents } => {
                    // One request/result pair per call, in the order the model asked.
                    for (i, intent) in intents.into_iter().enumerate() {
                        if cancel.is_cancelled() {
                            return Err(ConversationError::Cancelled.into());
                        }

                        let mut request = Message::function_request(FunctionCall {
                            name: intent.name.clone(),
                            arguments: intent.raw_arguments.clone(),
                        });
                        if i == 0 {
                            request.content = text.clone();
                        }
                        history.push(request);

                        let progress = |description: &str| observer.on_function_call(description);
                        let dispatched = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                debug!(tool = %intent.name, "tool call cancelled");
                                return Err(ConversationError::Cancelled.into());
                            }
                            result = self.registry.dispatch(&intent, &progress) => result,
                        };
                        let content = match dispatched {
                            Ok(value) => serde_json::to_string(&value)
                                .unwrap_or_else(|_| "null".to_string()),
                            Err(err) if err.is_recoverable() => {
                                warn!(tool = %intent.name, error = %err, "returning tool error to the model");
                                serde_json::json!({ "error": err.to_string() }).to_string()
                            }
                            Err(err) => return Err(err.into()),
                        };

                        history.push(Message::function_result(intent.name, content));
                    }
                    LoopState::ToolExecuted
                }

                LoopState::ToolExecuted => LoopState::AwaitingCompletion,

                LoopState::FinalAnswer(answer) => {
                    info!(round_trips, chars = answer.len(), "function-call loop answered");
                    history.push(Message::assistant(answer.clone()));
                    return Ok(LoopOutcome {
                        answer,
                        history,
                        round_trips,
                    });
                }
            };
        }
    }
}
