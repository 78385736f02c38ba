//! Tools the model can call, and the registry that dispatches them.

pub mod registry;
pub mod schema;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{BoxTool, Tool, ToolFailure};
