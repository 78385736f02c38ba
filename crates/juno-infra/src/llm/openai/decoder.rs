//! Incremental decoder for OpenAI-style server-sent events.
//!
//! The response body arrives as arbitrary byte slices. [`SseDecoder`]
//! buffers raw bytes until a full line is available, so a multi-byte UTF-8
//! character or a JSON payload split across two network reads decodes the
//! same as if it had arrived in one piece. A frame ends at a blank line.

use juno_types::llm::{FinishReason, StreamEvent};
use tracing::trace;

use super::types::ChunkPayload;

const DONE_SENTINEL: &str = "[DONE]";

/// Turns SSE bytes into [`StreamEvent`]s in arrival order.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// `data:` lines of the frame being assembled.
    data: Vec<String>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed the next slice of the body.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.handle_line(&String::from_utf8_lossy(&line), &mut events);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Flush whatever is left once the body has ended.
    ///
    /// A trailing line without a newline and a frame without its closing
    /// blank line are both decoded.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            self.handle_line(line.trim_end_matches('\r'), &mut events);
        }
        if !self.done {
            self.dispatch(&mut events);
        }
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if line.trim() == DONE_SENTINEL {
            // Some proxies send the sentinel without a `data:` field.
            self.dispatch(events);
            self.mark_done(events);
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        } else {
            trace!(field, "ignoring SSE field");
        }
    }

    fn dispatch(&mut self, events: &mut Vec<StreamEvent>) {
        if self.data.is_empty() {
            return;
        }
        let payload = std::mem::take(&mut self.data).join("\n");

        if payload.trim() == DONE_SENTINEL {
            self.mark_done(events);
            return;
        }

        match serde_json::from_str::<ChunkPayload>(&payload) {
            Ok(chunk) => chunk_events(chunk, events),
            Err(_) => events.push(StreamEvent::Malformed { raw: payload }),
        }
    }

    fn mark_done(&mut self, events: &mut Vec<StreamEvent>) {
        if !self.done {
            self.done = true;
            events.push(StreamEvent::Done);
        }
    }
}

fn chunk_events(chunk: ChunkPayload, events: &mut Vec<StreamEvent>) {
    if let Some(error) = chunk.error {
        events.push(StreamEvent::Error {
            message: error.message,
        });
        return;
    }
    let Some(choice) = chunk.choices.into_iter().next() else {
        return;
    };
    let delta = choice.delta;

    if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::Delta { text });
    }
    if let Some(call) = delta.function_call {
        events.push(StreamEvent::FunctionCallDelta {
            index: 0,
            name: call.name,
            arguments: call.arguments.unwrap_or_default(),
        });
    }
    for call in delta.tool_calls.unwrap_or_default() {
        let function = call.function.unwrap_or_default();
        events.push(StreamEvent::FunctionCallDelta {
            index: call.index,
            name: function.name,
            arguments: function.arguments.unwrap_or_default(),
        });
    }
    if let Some(reason) = choice.finish_reason {
        events.push(StreamEvent::Finish {
            reason: FinishReason::from(reason.as_str()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HI_THEN_DONE: &str =
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";

    fn decode_in_pieces(body: &[u8], sizes: &[usize]) -> Vec<StreamEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        let mut rest = body;
        let mut i = 0;
        while !rest.is_empty() {
            let n = sizes[i % sizes.len()].min(rest.len());
            events.extend(decoder.push(&rest[..n]));
            rest = &rest[n..];
            i += 1;
        }
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn test_delta_then_done() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(HI_THEN_DONE.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta {
                    text: "Hi".to_string()
                },
                StreamEvent::Done
            ]
        );
        assert!(decoder.is_done());
    }

    #[test]
    fn test_split_invariance() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"h\u{e9}llo \u{1F600}\"}}]}\r\n\r\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n"
        )
        .as_bytes();
        let whole = decode_in_pieces(body, &[body.len()]);
        assert_eq!(whole.len(), 4);

        let splits: [&[usize]; 5] = [&[1], &[2], &[3, 7], &[5, 1, 11], &[64]];
        for sizes in splits {
            assert_eq!(decode_in_pieces(body, sizes), whole, "split sizes {sizes:?}");
        }
    }

    #[test]
    fn test_malformed_frame_does_not_stop_decoding() {
        let body = "data: {not json\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n";
        let mut decoder = SseDecoder::new();
        let events = decoder.push(body.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Malformed {
                    raw: "{not json".to_string()
                },
                StreamEvent::Delta {
                    text: "ok".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_everything_after_done_is_ignored() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(b"data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n");
        events.extend(decoder.push(b"data: more\n\n"));
        events.extend(decoder.finish());
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"choices\":\ndata: [{\"delta\":{\"content\":\"x\"}}]}\n\n");
        assert_eq!(
            events,
            vec![StreamEvent::Delta {
                text: "x".to_string()
            }]
        );
    }

    #[test]
    fn test_non_data_fields_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: message\nid: 7\nretry: 100\n\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_legacy_function_call_fragments() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":null,\"function_call\":{\"name\":\"getContext\",\"arguments\":\"\"}}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"function_call\":{\"arguments\":\"{\\\"query\\\":\"}}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"function_call\"}]}\n\n",
        );
        let mut decoder = SseDecoder::new();
        let events = decoder.push(body.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::FunctionCallDelta {
                    index: 0,
                    name: Some("getContext".to_string()),
                    arguments: String::new(),
                },
                StreamEvent::FunctionCallDelta {
                    index: 0,
                    name: None,
                    arguments: "{\"query\":".to_string(),
                },
                StreamEvent::Finish {
                    reason: FinishReason::FunctionCall
                },
            ]
        );
    }

    #[test]
    fn test_tool_calls_fragments_keep_their_index() {
        let body = "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"a\",\"type\":\"function\",\"function\":{\"name\":\"echo\",\"arguments\":\"{}\"}},{\"index\":1,\"function\":{\"name\":\"echo\",\"arguments\":\"{\\\"n\\\":2}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n";
        let mut decoder = SseDecoder::new();
        let events = decoder.push(body.as_bytes());
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], StreamEvent::FunctionCallDelta { index: 1, arguments, .. } if arguments == "{\"n\":2}"));
        assert_eq!(
            events[2],
            StreamEvent::Finish {
                reason: FinishReason::FunctionCall
            }
        );
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}").is_empty());
        assert_eq!(
            decoder.finish(),
            vec![StreamEvent::Delta {
                text: "tail".to_string()
            }]
        );
        assert!(!decoder.is_done());
    }

    #[test]
    fn test_error_frame_is_reported() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(
            b"data: {\"error\":{\"message\":\"The server had an error\",\"type\":\"server_error\"}}\n\n",
        );
        assert_eq!(
            events,
            vec![StreamEvent::Error {
                message: "The server had an error".to_string()
            }]
        );
    }

    #[test]
    fn test_bare_done_line_ends_the_stream() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n[DONE]\n\n");
        events.extend(decoder.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n"));
        events.extend(decoder.finish());
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta {
                    text: "Hi".to_string()
                },
                StreamEvent::Done
            ]
        );
        assert!(decoder.is_done());
    }

    #[test]
    fn test_empty_choices_yield_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"choices\":[]}\n\n").is_empty());
    }
}
