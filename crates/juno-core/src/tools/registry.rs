//! Tool registry and dispatcher.
//!
//! The registry is built once, before a dialogue starts, and shared
//! immutably afterwards. `dispatch` turns a [`FunctionCallIntent`] into a
//! JSON result: unknown names and bad arguments are rejected before any
//! handler runs, and handler failures are wrapped with the tool name.

use std::collections::HashMap;

use tracing::{debug, info_span, Instrument};

use juno_types::tool::{FunctionCallIntent, ToolDescriptor, ToolError};

use super::schema;
use super::tool::{BoxTool, Tool};

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: BoxTool,
}

/// Name-indexed table of tool handlers.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        let handler = BoxTool::new(tool);
        let descriptor = handler.descriptor();
        if self.by_name.contains_key(&descriptor.name) {
            return Err(ToolError::DuplicateTool(descriptor.name));
        }
        self.by_name.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Descriptors in registration order, for advertising to the model.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and execute one function call.
    ///
    /// `on_progress` receives the tool's invocation description, if it has
    /// one, after validation and before execution.
    pub async fn dispatch(
        &self,
        intent: &FunctionCallIntent,
        on_progress: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<serde_json::Value, ToolError> {
        let entry = self
            .by_name
            .get(&intent.name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(intent.name.clone()))?;

        let args = parse_arguments(&intent.raw_arguments).map_err(|reason| {
            ToolError::InvalidArguments {
                tool: intent.name.clone(),
                reason,
            }
        })?;

        schema::validate(&entry.descriptor.parameters, &args).map_err(|reason| {
            ToolError::InvalidArguments {
                tool: intent.name.clone(),
                reason,
            }
        })?;

        if let Some(description) = entry.handler.describe_invocation(&args) {
            on_progress(&description);
        }

        let span = info_span!("tool.execute", tool.name = %intent.name);
        let result = entry.handler.execute(args).instrument(span).await;

        match result {
            Ok(value) => {
                debug!(tool = %intent.name, "tool executed");
                Ok(value)
            }
            Err(failure) => Err(ToolError::Execution {
                tool: intent.name.clone(),
                retryable: failure.retryable,
                source: failure.source.into(),
            }),
        }
    }
}

/// Models sometimes send an empty string for argument-less calls.
fn parse_arguments(raw: &str) -> Result<serde_json::Value, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| format!("arguments are not valid JSON: {e}"))
}
