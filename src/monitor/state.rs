//! Observable monitor types.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default refresh window before expiry.
pub const DEFAULT_BUFFER_TIME: Duration = Duration::from_secs(5 * 60);

/// Default polling cadence while foregrounded.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Timing for the token monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Refresh once the token expires within this window. Also the minimum
    /// spacing between two successful refreshes.
    pub buffer_time: Duration,
    /// How often to check while the app is in the foreground.
    pub check_interval: Duration,
}

impl MonitorConfig {
    pub fn new(buffer_time: Duration, check_interval: Duration) -> Self {
        Self {
            buffer_time,
            check_interval,
        }
    }

    pub(crate) fn buffer(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.buffer_time)
            .unwrap_or_else(|_| chrono::Duration::days(3650))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_TIME, DEFAULT_CHECK_INTERVAL)
    }
}

/// Monitor state, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Monitoring,
    /// App is in the background; no timer is running.
    Paused,
    Refreshing,
    /// No refreshable session. The monitor keeps running and leaves this
    /// state once a new session is stored.
    Unauthenticated,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MonitorState::Stopped => "stopped",
            MonitorState::Monitoring => "monitoring",
            MonitorState::Paused => "paused",
            MonitorState::Refreshing => "refreshing",
            MonitorState::Unauthenticated => "unauthenticated",
        };
        write!(f, "{}", s)
    }
}

/// Session changes worth telling the rest of the app about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new access token was stored.
    Refreshed { expires_at: DateTime<Utc> },
    /// The session is gone; the user has to sign in again.
    LoginRequired,
}

/// Whether the app is visible to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppLifecycle {
    #[default]
    Foreground,
    Background,
}

/// Result of a single [`check_and_refresh_token`] call.
///
/// [`check_and_refresh_token`]: super::TokenMonitor::check_and_refresh_token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Token is outside the buffer window.
    Fresh,
    Refreshed,
    /// Another check is already refreshing.
    AlreadyRefreshing,
    /// Token is inside the window but the last refresh was too recent.
    Throttled,
    /// No credential, or no refresh token, or the server rejected it.
    Unauthenticated,
    /// Transient failure; the next cycle tries again.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.buffer_time, Duration::from_secs(300));
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.buffer(), chrono::Duration::minutes(5));
        assert_eq!(AppLifecycle::default(), AppLifecycle::Foreground);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(MonitorState::Unauthenticated.to_string(), "unauthenticated");
        assert_eq!(MonitorState::Paused.to_string(), "paused");
    }
}
