//! Event types for the UI shell notification bus.
//!
//! `ShellEvent` is what the conversation core tells whatever is presenting
//! the conversation. All variants are Clone + Send + Sync for use with tokio
//! broadcast channels; the JSON shape (`{"type": ..., "content": ...}`) is
//! what `juno --json` prints, one event per line.

use serde::{Deserialize, Serialize};

/// Lifecycle notifications for one streamed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum ShellEvent {
    /// The first delta of a response arrived.
    #[serde(rename = "stream.start")]
    StreamStart,

    /// Full accumulated text so far.
    #[serde(rename = "stream.update")]
    StreamUpdate(String),

    /// The response finished; carries the final text.
    #[serde(rename = "stream.end")]
    StreamEnd(String),

    /// Human-readable progress text for a tool about to run.
    #[serde(rename = "stream.function_call")]
    FunctionCall(String),

    /// Only the newest delta.
    #[serde(rename = "chunk")]
    Chunk(String),

    /// A non-fatal problem worth showing (e.g. a malformed stream frame).
    #[serde(rename = "error")]
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&ShellEvent::StreamUpdate("Hel".into())).unwrap();
        assert_eq!(json, r#"{"type":"stream.update","content":"Hel"}"#);

        let json = serde_json::to_string(&ShellEvent::StreamStart).unwrap();
        assert_eq!(json, r#"{"type":"stream.start"}"#);

        let json = serde_json::to_string(&ShellEvent::FunctionCall("gathering data: auth".into()))
            .unwrap();
        assert_eq!(
            json,
            r#"{"type":"stream.function_call","content":"gathering data: auth"}"#
        );
    }

    #[test]
    fn test_chunk_roundtrip() {
        let event: ShellEvent = serde_json::from_str(r#"{"type":"chunk","content":"lo"}"#).unwrap();
        assert_eq!(event, ShellEvent::Chunk("lo".into()));
    }
}
