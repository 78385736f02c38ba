//! LLM request/response types for Juno.
//!
//! These types model the chat-completion data shapes: conversation messages,
//! streaming completion requests, decoded stream events, and provider errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::tool::ToolDescriptor;

/// Model used when neither the caller nor the config names one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Model used by the function-call loop (needs function calling support).
pub const FUNCTION_CALLING_MODEL: &str = "gpt-3.5-turbo-0613";

/// Sampling temperature used by the function-call loop.
pub const FUNCTION_CALLING_TEMPERATURE: f64 = 0.2;

/// A chat model the shell offers for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub context_window: u32,
    pub function_calling: bool,
}

/// Models offered by `juno models`.
pub const KNOWN_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-3.5-turbo",
        context_window: 4_096,
        function_calling: false,
    },
    ModelInfo {
        id: "gpt-4",
        context_window: 8_192,
        function_calling: false,
    },
    ModelInfo {
        id: "gpt-4-0613",
        context_window: 8_192,
        function_calling: true,
    },
];

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Function,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Function => write!(f, "function"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "function" => Ok(MessageRole::Function),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A function invocation requested by the model, as echoed back in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON text exactly as the model produced it.
    pub arguments: String,
}

/// A single message in an LLM conversation.
///
/// `name` is set on function-role messages (the function that produced the
/// content). `function_call` is set only on assistant messages that requested
/// a tool; the provider requires that message to precede the function result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            content: content.into(),
            function_call: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Assistant message recording a function call request.
    pub fn function_request(call: FunctionCall) -> Self {
        Self {
            role: MessageRole::Assistant,
            name: None,
            content: String::new(),
            function_call: Some(call),
        }
    }

    /// Function-role message carrying a serialized tool result.
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Function,
            name: Some(name.into()),
            content: content.into(),
            function_call: None,
        }
    }
}

/// Request to an LLM provider for a streaming chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Functions advertised to the model. Empty means no function calling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<ToolDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            functions: Vec::new(),
            temperature: None,
            stream: true,
        }
    }
}

/// Reason why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    FunctionCall,
    ContentFilter,
    Other(String),
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::Length => write!(f, "length"),
            FinishReason::FunctionCall => write!(f, "function_call"),
            FinishReason::ContentFilter => write!(f, "content_filter"),
            FinishReason::Other(reason) => write!(f, "{reason}"),
        }
    }
}

impl From<&str> for FinishReason {
    fn from(s: &str) -> Self {
        match s {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            // `tool_calls` is the newer spelling of the same outcome.
            "function_call" | "tool_calls" => FinishReason::FunctionCall,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Events decoded from a streaming completion body, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// An incremental fragment of assistant text.
    Delta { text: String },

    /// An incremental fragment of a function call. `name` is only present on
    /// the first fragment of a call; `arguments` fragments concatenate to
    /// the raw JSON argument text.
    FunctionCallDelta {
        index: u32,
        name: Option<String>,
        arguments: String,
    },

    /// The model reported why it stopped.
    Finish { reason: FinishReason },

    /// The terminal `[DONE]` sentinel.
    Done,

    /// A frame whose payload could not be interpreted. Decoding continues.
    Malformed { raw: String },

    /// The provider reported an error inside the stream. The completion
    /// fails.
    Error { message: String },
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
