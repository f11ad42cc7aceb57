//! SSE (Server-Sent Events) stream parser
//!
//! SSE format consists of:
//! - `event: <type>` - event type line
//! - `data: <json>` - data payload line
//! - Empty line - signals end of event
//! - Lines starting with `:` - comments (ignored)

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::{Buf, BytesMut};
use futures::{Stream, StreamExt};

use super::events::{parse_message, RealtimeMessage};
use crate::error::StreamError;
use crate::traits::ByteStream;

/// Stream of decoded realtime messages.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<RealtimeMessage, StreamError>> + Send>>;

/// Event type used when the server sends data without an `event:` line
/// and without a `type` field.
const DEFAULT_EVENT_TYPE: &str = "notification";

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: notification")
    Event(String),
    /// Data payload (e.g., "data: {\"id\": 1}")
    Data(String),
    /// Empty line - signals end of event
    Empty,
    /// Comment line (starts with ':')
    Comment(String),
}

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }

    // Unknown line format (id:, retry:) - treat as comment
    SseLine::Comment(line.to_string())
}

/// Stateful SSE parser that accumulates lines and emits complete messages
#[derive(Debug, Default)]
pub struct SseParser {
    /// Current event type being accumulated
    current_event_type: Option<String>,
    /// Accumulated data lines (SSE allows multiple data: lines)
    data_buffer: Vec<String>,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line to the parser, potentially returning a complete message
    ///
    /// Returns:
    /// - `Ok(Some(message))` - A complete message was parsed
    /// - `Ok(None)` - Line was consumed but message is incomplete
    /// - `Err(error)` - Parse error occurred
    pub fn feed_line(&mut self, line: &str) -> Result<Option<RealtimeMessage>, StreamError> {
        match parse_sse_line(line) {
            SseLine::Event(event_type) => {
                self.current_event_type = Some(event_type);
                Ok(None)
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                Ok(None)
            }
            SseLine::Empty => self.try_emit(),
            SseLine::Comment(_) => Ok(None),
        }
    }

    fn try_emit(&mut self) -> Result<Option<RealtimeMessage>, StreamError> {
        if self.current_event_type.is_none() && self.data_buffer.is_empty() {
            return Ok(None);
        }

        let mut event_type = self.current_event_type.take();
        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();

        // Without an event line, look for a "type" field in the payload
        if event_type.is_none() && !data.is_empty() {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&data) {
                if let Some(t) = json.get("type").and_then(|v| v.as_str()) {
                    event_type = Some(t.to_string());
                }
            }
        }

        let event_type = match event_type {
            Some(et) if et != "message" => et,
            _ => DEFAULT_EVENT_TYPE.to_string(),
        };

        if data.is_empty() {
            return match event_type.as_str() {
                "ping" | "keepalive" | "heartbeat" | "connected" => {
                    parse_message(&event_type, "{}").map(Some)
                }
                _ => Err(StreamError::InvalidJson {
                    event_type,
                    message: "missing data".to_string(),
                }),
            };
        }

        parse_message(&event_type, &data).map(Some)
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.current_event_type = None;
        self.data_buffer.clear();
    }
}

/// Splits a byte stream into lines, accepting `\n` and `\r\n` endings.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Whatever is left after the last line ending.
    fn take_rest(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line = self.buf.split_to(pos);
        self.buf.advance(1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

struct DecodeState {
    body: ByteStream,
    lines: LineBuffer,
    parser: SseParser,
    ready: VecDeque<Result<RealtimeMessage, StreamError>>,
    finished: bool,
}

/// Decode an SSE response body into realtime messages.
///
/// A transport error is yielded as [`StreamError::ConnectionLost`] and ends
/// the stream. Malformed events are yielded as errors without ending it.
pub fn decode_sse(body: ByteStream) -> MessageStream {
    let state = DecodeState {
        body,
        lines: LineBuffer::default(),
        parser: SseParser::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    state.lines.push(&chunk);
                    while let Some(line) = state.lines.next_line() {
                        if let Some(item) = state.parser.feed_line(&line).transpose() {
                            state.ready.push_back(item);
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.ready.push_back(Err(StreamError::ConnectionLost {
                        message: e.to_string(),
                    }));
                }
                None => {
                    state.finished = true;
                    // Flush an event the server did not terminate
                    let rest = state.lines.take_rest();
                    for line in rest.iter().map(String::as_str).chain([""]) {
                        if let Some(item) = state.parser.feed_line(line).transpose() {
                            state.ready.push_back(item);
                        }
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::HttpError;
    use bytes::Bytes;

    fn body(chunks: Vec<Result<&'static str, HttpError>>) -> ByteStream {
        Box::pin(futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
        assert_eq!(parse_sse_line(": keepalive"), SseLine::Comment("keepalive".to_string()));
        assert_eq!(
            parse_sse_line("event: notification"),
            SseLine::Event("notification".to_string())
        );
        assert_eq!(parse_sse_line("data: {}"), SseLine::Data("{}".to_string()));
        assert_eq!(parse_sse_line("id: 7"), SseLine::Comment("id: 7".to_string()));
    }

    #[test]
    fn test_parser_emits_on_empty_line() {
        let mut parser = SseParser::new();
        assert!(parser.feed_line("event: notification").unwrap().is_none());
        assert!(parser.feed_line(r#"data: {"id": "n1"}"#).unwrap().is_none());

        let msg = parser.feed_line("").unwrap().unwrap();
        assert!(matches!(msg, RealtimeMessage::Notification(ref n) if n.id == "n1"));

        // Consecutive empty lines emit nothing
        assert!(parser.feed_line("").unwrap().is_none());
    }

    #[test]
    fn test_parser_joins_multiline_data() {
        let mut parser = SseParser::new();
        parser.feed_line("event: notification").unwrap();
        parser.feed_line(r#"data: {"id": "n1","#).unwrap();
        parser.feed_line(r#"data:  "message": "hi"}"#).unwrap();

        match parser.feed_line("").unwrap() {
            Some(RealtimeMessage::Notification(n)) => assert_eq!(n.message.as_deref(), Some("hi")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parser_type_field_and_default() {
        let mut parser = SseParser::new();
        parser.feed_line(r#"data: {"type": "ping"}"#).unwrap();
        assert_eq!(parser.feed_line("").unwrap(), Some(RealtimeMessage::Ping));

        parser.feed_line("event: message").unwrap();
        parser.feed_line(r#"data: {"id": 3}"#).unwrap();
        assert!(matches!(
            parser.feed_line("").unwrap(),
            Some(RealtimeMessage::Notification(_))
        ));
    }

    #[test]
    fn test_parser_empty_data() {
        let mut parser = SseParser::new();
        parser.feed_line("event: ping").unwrap();
        assert_eq!(parser.feed_line("").unwrap(), Some(RealtimeMessage::Ping));

        parser.feed_line("event: notification").unwrap();
        assert!(parser.feed_line("").is_err());
    }

    #[test]
    fn test_parser_reset() {
        let mut parser = SseParser::new();
        parser.feed_line("event: notification").unwrap();
        parser.feed_line("data: {").unwrap();
        parser.reset();
        assert!(parser.feed_line("").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decode_across_chunk_boundaries() {
        let stream = decode_sse(body(vec![
            Ok(": hello\r\n\r\nevent: notifi"),
            Ok("cation\r\ndata: {\"id\": \"a\"}\r"),
            Ok("\n\r\nevent: ping\n\n"),
            Ok("data: {\"id\": \"b\"}\n\n"),
        ]));
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], Ok(RealtimeMessage::Notification(n)) if n.id == "a"));
        assert_eq!(items[1], Ok(RealtimeMessage::Ping));
        assert!(matches!(&items[2], Ok(RealtimeMessage::Notification(n)) if n.id == "b"));
    }

    #[tokio::test]
    async fn test_decode_keeps_going_after_bad_event() {
        let stream = decode_sse(body(vec![Ok(
            "data: {broken\n\ndata: {\"id\": \"ok\"}\n\n",
        )]));
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert!(items[1].is_ok());
    }

    #[tokio::test]
    async fn test_decode_transport_error_ends_stream() {
        let stream = decode_sse(body(vec![
            Ok("data: {\"id\": \"a\"}\n\n"),
            Err(HttpError::Io("reset".to_string())),
            Ok("data: {\"id\": \"never\"}\n\n"),
        ]));
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(StreamError::ConnectionLost { .. })));
    }

    #[tokio::test]
    async fn test_decode_flushes_unterminated_event() {
        let stream = decode_sse(body(vec![Ok("data: {\"id\": \"tail\"}")]));
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 1);
    }
}
