//! Reconnect backoff for the realtime channel.

use std::time::Duration;

/// Exponential backoff for reconnect attempts.
///
/// The first failure waits the base delay; each further failure doubles it
/// up to a maximum cap. Resets to base delay on success.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base delay (first retry)
    base_delay: Duration,
    /// Delay to wait before the next attempt
    current_delay: Duration,
    /// Maximum delay cap
    max_delay: Duration,
    /// Number of consecutive failures
    failure_count: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff with default settings.
    ///
    /// Default: 1s base, 30s max.
    pub fn new() -> Self {
        Self::with_config(Duration::from_secs(1), Duration::from_secs(30))
    }

    /// Create a new backoff with custom settings.
    pub fn with_config(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            current_delay: base_delay,
            max_delay: max_delay.max(base_delay),
            failure_count: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn record_failure(&mut self) -> Duration {
        let delay = if self.failure_count == 0 {
            self.base_delay
        } else {
            (self.current_delay * 2).min(self.max_delay)
        };
        self.failure_count = self.failure_count.saturating_add(1);
        self.current_delay = delay;
        delay
    }

    /// Reset backoff on success.
    pub fn reset(&mut self) {
        self.failure_count = 0;
        self.current_delay = self.base_delay;
    }

    /// Current failure count.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Current delay duration.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}
