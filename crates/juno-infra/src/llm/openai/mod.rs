//! OpenAI-compatible chat completions over HTTP with SSE streaming.
//!
//! Works against any endpoint that speaks the `/chat/completions` protocol
//! with legacy `functions` support.

pub mod client;
pub mod decoder;
pub mod types;

pub use client::OpenAiProvider;
pub use decoder::SseDecoder;

use juno_types::llm::LlmError;

/// Map a non-2xx response to the matching [`LlmError`].
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        401 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        503 | 529 => LlmError::Overloaded(body),
        400 | 404 | 422 => LlmError::InvalidRequest(format!("HTTP {status}: {body}")),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, "busy".into()),
            LlmError::Overloaded(ref b) if b == "busy"
        ));
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".into());
        assert_eq!(
            err.to_string(),
            "provider error: HTTP 500 Internal Server Error: boom"
        );
    }
}
