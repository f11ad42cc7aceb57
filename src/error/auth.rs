//! Authentication-related error types.
//!
//! This module defines errors related to sessions, token management,
//! and login.

use std::fmt;

/// Authentication-specific error variants.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Access token has expired.
    TokenExpired,

    /// No refresh token is stored, so the session cannot be renewed.
    MissingRefreshToken,

    /// Refresh token has expired or was rejected by the server.
    RefreshTokenInvalid { message: String },

    /// Refreshing the access token failed for a non-session reason.
    RefreshFailed { message: String },

    /// No credentials available (user not logged in).
    NotAuthenticated,

    /// Login was rejected (wrong email/password, malformed input).
    InvalidCredentials { message: String },

    /// Authorization was denied by the server.
    AccessDenied { resource: Option<String> },

    /// API returned an authentication error.
    ApiError { status: u16, message: String },
}

impl AuthError {
    /// Check if this error can only be resolved by signing in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::TokenExpired
                | AuthError::MissingRefreshToken
                | AuthError::RefreshTokenInvalid { .. }
                | AuthError::NotAuthenticated
                | AuthError::ApiError { status: 401, .. }
        )
    }

    /// Check if this is a validation problem the user can correct in place.
    pub fn is_validation(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials { .. })
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::TokenExpired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::MissingRefreshToken | AuthError::RefreshTokenInvalid { .. } => {
                "Your session could not be renewed. Please sign in again.".to_string()
            }
            AuthError::RefreshFailed { .. } => {
                "Failed to renew your session. We'll try again shortly.".to_string()
            }
            AuthError::NotAuthenticated => {
                "You are not signed in. Please sign in to continue.".to_string()
            }
            AuthError::InvalidCredentials { message } => {
                if message.is_empty() {
                    "Incorrect email or password.".to_string()
                } else {
                    message.clone()
                }
            }
            AuthError::AccessDenied { resource } => match resource {
                Some(r) => format!("Access denied to {}.", r),
                None => "Access denied. You don't have permission for this action.".to_string(),
            },
            AuthError::ApiError { status, message } => match *status {
                401 => "Your session has expired. Please sign in again.".to_string(),
                403 => "Access denied. You don't have permission for this action.".to_string(),
                _ => format!("Authentication error: {}", message),
            },
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "E_AUTH_TOKEN_EXP",
            AuthError::MissingRefreshToken => "E_AUTH_NO_REFRESH",
            AuthError::RefreshTokenInvalid { .. } => "E_AUTH_REFRESH_INV",
            AuthError::RefreshFailed { .. } => "E_AUTH_REFRESH_FAIL",
            AuthError::NotAuthenticated => "E_AUTH_NOT_AUTH",
            AuthError::InvalidCredentials { .. } => "E_AUTH_INVALID",
            AuthError::AccessDenied { .. } => "E_AUTH_ACCESS",
            AuthError::ApiError { .. } => "E_AUTH_API",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::TokenExpired => write!(f, "Access token has expired"),
            AuthError::MissingRefreshToken => write!(f, "No refresh token available"),
            AuthError::RefreshTokenInvalid { message } => {
                write!(f, "Refresh token invalid: {}", message)
            }
            AuthError::RefreshFailed { message } => write!(f, "Token refresh failed: {}", message),
            AuthError::NotAuthenticated => write!(f, "Not authenticated"),
            AuthError::InvalidCredentials { message } => {
                write!(f, "Invalid credentials: {}", message)
            }
            AuthError::AccessDenied { resource } => match resource {
                Some(r) => write!(f, "Access denied to '{}'", r),
                None => write!(f, "Access denied"),
            },
            AuthError::ApiError { status, message } => {
                write!(f, "Authentication API error ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for AuthError {}
