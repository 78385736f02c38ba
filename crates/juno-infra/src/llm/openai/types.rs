//! OpenAI chat-completions and embeddings wire types.

use serde::{Deserialize, Serialize};

use juno_types::llm::{CompletionRequest, FunctionCall, Message, MessageRole};
use juno_types::tool::ToolDescriptor;

/// Request body for `POST /chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "no_functions")]
    pub functions: &'a [ToolDescriptor],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub stream: bool,
}

fn no_functions(functions: &&[ToolDescriptor]) -> bool {
    functions.is_empty()
}

impl<'a> ChatRequest<'a> {
    pub fn from_request(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            functions: &request.functions,
            temperature: request.temperature,
            stream: true,
        }
    }
}

/// A message as the endpoint expects it.
///
/// An assistant message that requests a function call sends `content: null`
/// when it has no text.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: MessageRole,
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<&'a FunctionCall>,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        let content = if message.function_call.is_some() && message.content.is_empty() {
            None
        } else {
            Some(message.content.as_str())
        };
        Self {
            role: message.role,
            content,
            name: message.name.as_deref(),
            function_call: message.function_call.as_ref(),
        }
    }
}

/// One `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
pub struct ChunkPayload {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Present when the provider fails after the response has started.
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub function_call: Option<FunctionCallChunk>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
}

/// Fragment of a legacy `function_call`.
#[derive(Debug, Default, Deserialize)]
pub struct FunctionCallChunk {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Fragment of one entry of `tool_calls`.
#[derive(Debug, Deserialize)]
pub struct ToolCallChunk {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub function: Option<FunctionCallChunk>,
}

/// Request body for `POST /embeddings`.
#[derive(Debug, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// The human-readable part of an error body, or the body itself.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}
