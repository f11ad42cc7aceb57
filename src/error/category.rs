//! Error category classification for unified error handling.
//!
//! Categories drive the decisions callers actually make: retry on the next
//! cycle, send the user back to login, or show the message.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport errors (connection, DNS, timeout).
    /// Retried implicitly on the next scheduled check or user action.
    Network,

    /// Authentication errors (401, expired or revoked session).
    /// Force navigation back to login.
    Auth,

    /// Backend errors (HTTP 5xx, service unavailable).
    Server,

    /// Client-side errors (bugs, invalid state).
    Client,

    /// Validation errors (bad credentials, malformed input).
    /// Shown to the user.
    Validation,

    /// Local storage and OS errors.
    System,

    /// Configuration errors (missing environment, bad values).
    Configuration,
}

impl ErrorCategory {
    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::Validation => "validation",
            ErrorCategory::System => "system",
            ErrorCategory::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
