//! How a failure is surfaced, depending on who started the operation.
//!
//! Direct user actions (login, password change) get a message. Background
//! work and optimistic actions fail silently. Anything that invalidates the
//! session sends the user back to login regardless of origin.

use super::category::ErrorCategory;
use super::tether_error::TetherError;

/// Who started the operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrigin {
    /// The user explicitly asked for this and is waiting on the result.
    Direct,
    /// Scheduled work such as the token refresh monitor.
    Background,
    /// An optimistic action that has already been rolled back locally.
    Optimistic,
}

/// What the front end should do with a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Show a non-blocking message.
    Toast(String),
    /// Log only.
    Silent,
    /// Drop the session and go to the login screen.
    Login,
}

impl Feedback {
    /// Decide how `err` should be surfaced for an operation of `origin`.
    pub fn for_error(err: &TetherError, origin: ActionOrigin) -> Self {
        if err.requires_reauth() {
            return Feedback::Login;
        }

        match origin {
            ActionOrigin::Direct => Feedback::Toast(err.user_message()),
            ActionOrigin::Background | ActionOrigin::Optimistic => {
                if err.category() == ErrorCategory::Configuration {
                    Feedback::Toast(err.user_message())
                } else {
                    Feedback::Silent
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, NetworkError};

    #[test]
    fn test_direct_action_gets_toast() {
        let err: TetherError = AuthError::InvalidCredentials {
            message: String::new(),
        }
        .into();
        assert_eq!(
            Feedback::for_error(&err, ActionOrigin::Direct),
            Feedback::Toast("Incorrect email or password.".to_string())
        );
    }

    #[test]
    fn test_optimistic_failure_is_silent() {
        let err: TetherError = NetworkError::HttpStatus {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(
            Feedback::for_error(&err, ActionOrigin::Optimistic),
            Feedback::Silent
        );
        assert_eq!(
            Feedback::for_error(&err, ActionOrigin::Background),
            Feedback::Silent
        );
    }

    #[test]
    fn test_session_errors_always_go_to_login() {
        let err: TetherError = NetworkError::HttpStatus {
            status: 401,
            message: "expired".to_string(),
        }
        .into();
        for origin in [
            ActionOrigin::Direct,
            ActionOrigin::Background,
            ActionOrigin::Optimistic,
        ] {
            assert_eq!(Feedback::for_error(&err, origin), Feedback::Login);
        }
    }
}
