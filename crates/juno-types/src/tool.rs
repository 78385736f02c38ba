//! Tool (function) calling types.
//!
//! A tool is advertised to the model by its [`ToolDescriptor`]; the model
//! answers with a [`FunctionCallIntent`] naming the tool and carrying raw
//! JSON arguments, which the dispatcher validates and executes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declaration of a tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique within a registry.
    pub name: String,
    pub description: String,
    /// JSON schema (an `object` schema) for the arguments.
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallIntent {
    pub name: String,
    /// Argument text as streamed by the model; may not be valid JSON.
    pub raw_arguments: String,
}

impl FunctionCallIntent {
    pub fn new(name: impl Into<String>, raw_arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_arguments: raw_arguments.into(),
        }
    }
}

/// Errors from tool registration and dispatch.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        /// Whether the model may reasonably try again (e.g. a transient lookup failure).
        retryable: bool,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
}

impl ToolError {
    /// Whether the function-call loop can hand this error back to the model
    /// instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. } => true,
            ToolError::Execution { retryable, .. } => *retryable,
            ToolError::DuplicateTool(_) => false,
        }
    }
}
