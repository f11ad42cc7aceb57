//! Unified error type for the tether client.
//!
//! `TetherError` consolidates the domain errors so callers can make one
//! decision per failure: retry later, send the user to login, or show the
//! message.

use std::fmt;

use super::auth::AuthError;
use super::category::ErrorCategory;
use super::network::NetworkError;
use super::stream::StreamError;
use crate::config::ConfigError;
use crate::traits::StoreError;

/// Unified error type for the tether client.
#[derive(Debug)]
pub enum TetherError {
    /// Transport and HTTP status errors.
    Network(NetworkError),

    /// Session and login errors.
    Auth(AuthError),

    /// Secure storage errors.
    Storage(StoreError),

    /// Realtime channel errors.
    Stream(StreamError),

    /// Configuration errors.
    Config(ConfigError),
}

impl TetherError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TetherError::Network(err) => match err.status() {
                Some(401) => ErrorCategory::Auth,
                Some(400) | Some(422) => ErrorCategory::Validation,
                Some(status) if status >= 500 => ErrorCategory::Server,
                _ => ErrorCategory::Network,
            },
            TetherError::Auth(err) => {
                if err.requires_reauth() {
                    ErrorCategory::Auth
                } else if err.is_validation() {
                    ErrorCategory::Validation
                } else {
                    match err {
                        AuthError::RefreshFailed { .. } => ErrorCategory::Network,
                        AuthError::AccessDenied { .. } => ErrorCategory::Client,
                        _ => ErrorCategory::Server,
                    }
                }
            }
            TetherError::Storage(_) => ErrorCategory::System,
            TetherError::Stream(_) => ErrorCategory::Network,
            TetherError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            TetherError::Network(err) => err.is_retryable(),
            TetherError::Auth(AuthError::RefreshFailed { .. }) => true,
            TetherError::Auth(_) => false,
            TetherError::Storage(_) => false,
            TetherError::Stream(err) => err.should_reconnect(),
            TetherError::Config(_) => false,
        }
    }

    /// Check if this error requires re-authentication.
    pub fn requires_reauth(&self) -> bool {
        match self {
            TetherError::Auth(err) => err.requires_reauth(),
            TetherError::Network(NetworkError::HttpStatus { status: 401, .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            TetherError::Network(err) => err.user_message(),
            TetherError::Auth(err) => err.user_message(),
            TetherError::Storage(err) => format!("Could not access secure storage: {}", err),
            TetherError::Stream(err) => err.user_message(),
            TetherError::Config(err) => format!("Configuration problem: {}", err),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            TetherError::Network(err) => err.error_code(),
            TetherError::Auth(err) => err.error_code(),
            TetherError::Storage(_) => "E_STORE",
            TetherError::Stream(err) => err.error_code(),
            TetherError::Config(_) => "E_CONFIG",
        }
    }
}

impl fmt::Display for TetherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TetherError::Network(err) => write!(f, "{}", err),
            TetherError::Auth(err) => write!(f, "{}", err),
            TetherError::Storage(err) => write!(f, "{}", err),
            TetherError::Stream(err) => write!(f, "{}", err),
            TetherError::Config(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for TetherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TetherError::Network(err) => Some(err),
            TetherError::Auth(err) => Some(err),
            TetherError::Storage(err) => Some(err),
            TetherError::Stream(err) => Some(err),
            TetherError::Config(err) => Some(err),
        }
    }
}

// ============================================================================
// From implementations for automatic error conversion
// ============================================================================

impl From<NetworkError> for TetherError {
    fn from(err: NetworkError) -> Self {
        TetherError::Network(err)
    }
}

impl From<AuthError> for TetherError {
    fn from(err: AuthError) -> Self {
        TetherError::Auth(err)
    }
}

impl From<StoreError> for TetherError {
    fn from(err: StoreError) -> Self {
        TetherError::Storage(err)
    }
}

impl From<StreamError> for TetherError {
    fn from(err: StreamError) -> Self {
        TetherError::Stream(err)
    }
}

impl From<ConfigError> for TetherError {
    fn from(err: ConfigError) -> Self {
        TetherError::Config(err)
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        TetherError::Network(NetworkError::InvalidResponse {
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn http(status: u16) -> TetherError {
        NetworkError::HttpStatus {
            status,
            message: "x".to_string(),
        }
        .into()
    }

    #[test]
    fn test_network_status_categories() {
        assert_eq!(http(401).category(), ErrorCategory::Auth);
        assert_eq!(http(400).category(), ErrorCategory::Validation);
        assert_eq!(http(422).category(), ErrorCategory::Validation);
        assert_eq!(http(500).category(), ErrorCategory::Server);
        assert_eq!(http(404).category(), ErrorCategory::Network);

        let conn: TetherError = NetworkError::ConnectionFailed {
            url: "u".to_string(),
            message: "m".to_string(),
        }
        .into();
        assert_eq!(conn.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_auth_categories() {
        let expired: TetherError = AuthError::TokenExpired.into();
        assert_eq!(expired.category(), ErrorCategory::Auth);

        let bad_login: TetherError = AuthError::InvalidCredentials {
            message: String::new(),
        }
        .into();
        assert_eq!(bad_login.category(), ErrorCategory::Validation);

        let transient: TetherError = AuthError::RefreshFailed {
            message: "503".to_string(),
        }
        .into();
        assert_eq!(transient.category(), ErrorCategory::Network);
        assert!(transient.is_retryable());
    }

    #[test]
    fn test_requires_reauth() {
        assert!(http(401).requires_reauth());
        assert!(!http(403).requires_reauth());
        assert!(!http(500).requires_reauth());
    }

    #[test]
    fn test_server_error_is_retryable() {
        let err = http(503);
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "E_NET_HTTP");
        assert!(!http(404).is_retryable());
    }

    #[test]
    fn test_store_error_is_system() {
        let err: TetherError = StoreError::WriteFailed("disk full".to_string()).into();
        assert_eq!(err.category(), ErrorCategory::System);
        assert!(err.source().is_some());
        assert_eq!(err.error_code(), "E_STORE");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err: TetherError = json_err.into();
        assert!(matches!(
            err,
            TetherError::Network(NetworkError::InvalidResponse { .. })
        ));
    }
}
