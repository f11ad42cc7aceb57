//! Tracing subscriber setup for the `tether` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "tether=info";

/// Build the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber writing human-readable lines to stderr.
///
/// Stdout is left to command output. Returns `false` if a subscriber was
/// already installed.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert_eq!(filter.to_string(), DEFAULT_FILTER);
    }

    #[test]
    fn test_second_init_is_rejected() {
        init();
        assert!(!init());
    }
}
