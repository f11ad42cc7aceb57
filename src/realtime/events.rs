//! Messages carried by the realtime channel.
//!
//! SSE and WebSocket carry the same JSON payloads. SSE names the message
//! with an `event:` line; WebSocket frames carry a `type` field instead.

use crate::error::StreamError;
use crate::models::NotificationEvent;

/// A decoded realtime message.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeMessage {
    Notification(NotificationEvent),
    /// Server greeting after the channel opens.
    Connected { user_id: Option<String> },
    /// Keepalive.
    Ping,
    /// A message type this client does not handle.
    Unknown(String),
}

/// Decode a message of `event_type` with JSON `data`.
///
/// Notification payloads may be flat or wrapped as `{"notification": {..}}`.
pub fn parse_message(event_type: &str, data: &str) -> Result<RealtimeMessage, StreamError> {
    let invalid = |e: serde_json::Error| StreamError::InvalidJson {
        event_type: event_type.to_string(),
        message: e.to_string(),
    };

    match event_type {
        "notification" => {
            let mut value: serde_json::Value = serde_json::from_str(data).map_err(invalid)?;
            if let Some(inner) = value.get_mut("notification").map(serde_json::Value::take) {
                value = inner;
            }
            let event = serde_json::from_value(value).map_err(invalid)?;
            Ok(RealtimeMessage::Notification(event))
        }
        "connected" => {
            let user_id = serde_json::from_str::<serde_json::Value>(data)
                .ok()
                .and_then(|v| {
                    v.get("user_id")
                        .or_else(|| v.get("userId"))
                        .and_then(|id| match id {
                            serde_json::Value::String(s) => Some(s.clone()),
                            serde_json::Value::Number(n) => Some(n.to_string()),
                            _ => None,
                        })
                });
            Ok(RealtimeMessage::Connected { user_id })
        }
        "ping" | "keepalive" | "heartbeat" => Ok(RealtimeMessage::Ping),
        other => Ok(RealtimeMessage::Unknown(other.to_string())),
    }
}

/// Decode one WebSocket text frame. The message type is read from the
/// frame's `type` field; frames without one are treated as notifications.
pub fn parse_frame(text: &str) -> Result<RealtimeMessage, StreamError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| StreamError::InvalidJson {
            event_type: "frame".to_string(),
            message: e.to_string(),
        })?;
    let event_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("notification");
    parse_message(event_type, text)
}
