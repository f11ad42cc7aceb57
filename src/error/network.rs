//! Network-related error types.
//!
//! Errors raised while talking to the REST backend: transport failures and
//! non-2xx responses.

use std::fmt;

use crate::traits::HttpError;

/// Network-specific error variants.
#[derive(Debug, Clone)]
pub enum NetworkError {
    /// Connection to the server failed.
    ConnectionFailed { url: String, message: String },

    /// Request timed out.
    Timeout { operation: String },

    /// HTTP status error (non-2xx response).
    HttpStatus { status: u16, message: String },

    /// Rate limited by server.
    RateLimited { retry_after_secs: Option<u64> },

    /// Response body could not be decoded.
    InvalidResponse { message: String },

    /// Request was cancelled.
    Cancelled,

    /// Generic network error.
    Other { message: String },
}

impl NetworkError {
    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed { .. } => true,
            NetworkError::Timeout { .. } => true,
            NetworkError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            NetworkError::RateLimited { .. } => true,
            NetworkError::InvalidResponse { .. } => false,
            NetworkError::Cancelled => false,
            NetworkError::Other { .. } => false,
        }
    }

    /// HTTP status if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::HttpStatus { status, .. } => Some(*status),
            NetworkError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { .. } => {
                "Unable to connect to the server. Please check your internet connection."
                    .to_string()
            }
            NetworkError::Timeout { operation } => {
                format!("The {} request timed out. Please try again.", operation)
            }
            NetworkError::HttpStatus { status, .. } => match *status {
                400 => "The request was invalid. Please try again.".to_string(),
                401 => "Authentication required. Please sign in again.".to_string(),
                403 => "Access denied. You don't have permission for this action.".to_string(),
                404 => "The requested resource was not found.".to_string(),
                429 => "Too many requests. Please wait a moment and try again.".to_string(),
                500..=599 => {
                    "The server is experiencing issues. Please try again later.".to_string()
                }
                _ => format!(
                    "The server returned an error (HTTP {}). Please try again.",
                    status
                ),
            },
            NetworkError::RateLimited { retry_after_secs } => match retry_after_secs {
                Some(secs) => format!(
                    "Too many requests. Please wait {} seconds before trying again.",
                    secs
                ),
                None => "Too many requests. Please wait a moment and try again.".to_string(),
            },
            NetworkError::InvalidResponse { .. } => {
                "Received an invalid response from the server. Please try again.".to_string()
            }
            NetworkError::Cancelled => "The request was cancelled.".to_string(),
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_HTTP",
            NetworkError::RateLimited { .. } => "E_NET_RATE",
            NetworkError::InvalidResponse { .. } => "E_NET_INVALID",
            NetworkError::Cancelled => "E_NET_CANCEL",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { operation } => write!(f, "{} timed out", operation),
            NetworkError::HttpStatus { status, message } => {
                write!(f, "HTTP {} error: {}", status, message)
            }
            NetworkError::RateLimited { retry_after_secs } => match retry_after_secs {
                Some(secs) => write!(f, "Rate limited, retry after {} seconds", secs),
                None => write!(f, "Rate limited"),
            },
            NetworkError::InvalidResponse { message } => {
                write!(f, "Invalid response: {}", message)
            }
            NetworkError::Cancelled => write!(f, "Request cancelled"),
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

impl NetworkError {
    /// Classify an HTTP seam error, keeping the URL for connection failures.
    pub fn from_http(err: HttpError, url: &str) -> Self {
        match err {
            HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
                url: url.to_string(),
                message,
            },
            HttpError::Timeout(_) => NetworkError::Timeout {
                operation: url.to_string(),
            },
            HttpError::ServerError { status: 429, .. } => NetworkError::RateLimited {
                retry_after_secs: None,
            },
            HttpError::ServerError { status, message } => {
                NetworkError::HttpStatus { status, message }
            }
            HttpError::Cancelled => NetworkError::Cancelled,
            HttpError::Io(message) | HttpError::InvalidUrl(message) | HttpError::Other(message) => {
                NetworkError::Other { message }
            }
        }
    }
}
