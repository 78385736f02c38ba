//! Tool trait and its object-safe wrapper.
//!
//! Follows the same blanket-impl pattern as `BoxEmbedder`:
//! 1. Define an object-safe `ToolDyn` trait with boxed futures
//! 2. Blanket-impl `ToolDyn` for all `T: Tool`
//! 3. `BoxTool` wraps `Box<dyn ToolDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use juno_types::tool::ToolDescriptor;

/// Why a tool handler failed.
///
/// Handlers mark failures the model could work around (a transient lookup
/// error, an empty result it could rephrase) as retryable; everything else
/// ends the function-call loop.
#[derive(Debug)]
pub struct ToolFailure {
    pub retryable: bool,
    pub source: anyhow::Error,
}

impl ToolFailure {
    pub fn fatal(source: impl Into<anyhow::Error>) -> Self {
        Self {
            retryable: false,
            source: source.into(),
        }
    }

    pub fn retryable(source: impl Into<anyhow::Error>) -> Self {
        Self {
            retryable: true,
            source: source.into(),
        }
    }
}

impl From<anyhow::Error> for ToolFailure {
    fn from(source: anyhow::Error) -> Self {
        Self::fatal(source)
    }
}

/// A function the model can call.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait Tool: Send + Sync {
    /// Name, description and JSON schema advertised to the model.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool. `args` has already been validated against the
    /// descriptor's parameter schema.
    fn execute(
        &self,
        args: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, ToolFailure>> + Send;

    /// Optional human-readable progress text shown while the tool runs.
    fn describe_invocation(&self, _args: &serde_json::Value) -> Option<String> {
        None
    }
}

/// Object-safe version of [`Tool`] with boxed futures.
pub trait ToolDyn: Send + Sync {
    fn descriptor_dyn(&self) -> ToolDescriptor;

    fn execute_boxed<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolFailure>> + Send + 'a>>;

    fn describe_invocation_dyn(&self, args: &serde_json::Value) -> Option<String>;
}

impl<T: Tool> ToolDyn for T {
    fn descriptor_dyn(&self) -> ToolDescriptor {
        self.descriptor()
    }

    fn execute_boxed<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolFailure>> + Send + 'a>> {
        Box::pin(self.execute(args))
    }

    fn describe_invocation_dyn(&self, args: &serde_json::Value) -> Option<String> {
        self.describe_invocation(args)
    }
}

/// Type-erased tool handler stored in the registry.
pub struct BoxTool {
    inner: Box<dyn ToolDyn>,
}

impl BoxTool {
    pub fn new<T: Tool + 'static>(tool: T) -> Self {
        Self {
            inner: Box::new(tool),
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        self.inner.descriptor_dyn()
    }

    pub async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolFailure> {
        self.inner.execute_boxed(args).await
    }

    pub fn describe_invocation(&self, args: &serde_json::Value) -> Option<String> {
        self.inner.describe_invocation_dyn(args)
    }
}
