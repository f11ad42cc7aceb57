//! Realtime-channel error types.
//!
//! Errors raised while receiving push notifications over SSE or WebSocket.

use std::fmt;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// Could not open the realtime channel.
    ConnectFailed { url: String, message: String },

    /// Channel connection was lost unexpectedly.
    ConnectionLost { message: String },

    /// Invalid JSON in a notification payload.
    InvalidJson { event_type: String, message: String },

    /// Channel was closed by the server.
    ServerClosed { reason: Option<String> },

    /// Gave up reconnecting.
    RetriesExhausted { attempts: u32 },
}

impl StreamError {
    /// Check if the channel should be reconnected after this error.
    pub fn should_reconnect(&self) -> bool {
        matches!(
            self,
            StreamError::ConnectFailed { .. }
                | StreamError::ConnectionLost { .. }
                | StreamError::ServerClosed { .. }
        )
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::ConnectFailed { .. } => {
                "Live notifications are unavailable right now.".to_string()
            }
            StreamError::ConnectionLost { .. } => {
                "Connection to live notifications was lost. Reconnecting...".to_string()
            }
            StreamError::InvalidJson { .. } => {
                "Received an unreadable notification.".to_string()
            }
            StreamError::ServerClosed { reason } => match reason {
                Some(r) => format!("Server closed the notification channel: {}", r),
                None => "Server closed the notification channel.".to_string(),
            },
            StreamError::RetriesExhausted { attempts } => format!(
                "Live notifications stopped after {} reconnect attempts.",
                attempts
            ),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::ConnectFailed { .. } => "E_STREAM_CONNECT",
            StreamError::ConnectionLost { .. } => "E_STREAM_LOST",
            StreamError::InvalidJson { .. } => "E_STREAM_JSON",
            StreamError::ServerClosed { .. } => "E_STREAM_CLOSED",
            StreamError::RetriesExhausted { .. } => "E_STREAM_RETRIES",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::ConnectFailed { url, message } => {
                write!(f, "Failed to connect to '{}': {}", url, message)
            }
            StreamError::ConnectionLost { message } => write!(f, "Connection lost: {}", message),
            StreamError::InvalidJson {
                event_type,
                message,
            } => write!(f, "Invalid JSON for event '{}': {}", event_type, message),
            StreamError::ServerClosed { reason } => match reason {
                Some(r) => write!(f, "Server closed stream: {}", r),
                None => write!(f, "Server closed stream"),
            },
            StreamError::RetriesExhausted { attempts } => {
                write!(f, "Gave up after {} reconnect attempts", attempts)
            }
        }
    }
}

impl std::error::Error for StreamError {}
