//! Token refresh monitor.
//!
//! [`TokenMonitor`] runs on its own timer and keeps the stored credential
//! fresh so that authorized requests keep working. It pauses while the app
//! is in the background.
//!
//! ```text
//! Stopped --start--> Monitoring <--foreground/background--> Paused
//!                       |    ^
//!         inside window |    | refreshed / transient failure
//!                       v    |
//!                     Refreshing --session invalid--> Unauthenticated
//! ```

mod state;
mod token_monitor;

pub use state::{
    AppLifecycle, CheckOutcome, MonitorConfig, MonitorState, SessionEvent, DEFAULT_BUFFER_TIME,
    DEFAULT_CHECK_INTERVAL,
};
pub use token_monitor::TokenMonitor;
