//! Streaming conversations and the function-call loop built on them.

pub mod engine;
pub mod function_loop;

pub use engine::{Completion, ConversationEngine, ConversationObserver, ConversationOptions, NoopObserver};
pub use function_loop::{FunctionCallLoop, LoopOptions, LoopOutcome, LoopState};
