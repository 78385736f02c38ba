use thiserror::Error;

use crate::llm::LlmError;
use crate::tool::ToolError;

/// Errors from a single streamed completion.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("conversation cancelled")]
    Cancelled,
}

/// Errors that end a function-call loop.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("no final answer after {limit} completion round trips")]
    RoundTripLimit { limit: usize },
}

impl LoopError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoopError::Conversation(ConversationError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_limit_display() {
        let err = LoopError::RoundTripLimit { limit: 5 };
        assert_eq!(err.to_string(), "no final answer after 5 completion round trips");
    }

    #[test]
    fn test_llm_error_is_transparent() {
        let err: ConversationError = LlmError::AuthenticationFailed.into();
        assert_eq!(err.to_string(), "authentication failed");
        let err: LoopError = ConversationError::Cancelled.into();
        assert!(err.is_cancelled());
    }
}
