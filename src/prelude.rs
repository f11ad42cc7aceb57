//! Prelude module for convenient imports.
//!
//! ```ignore
//! use tether::prelude::*;
//! ```

// Session and configuration
pub use crate::config::ClientConfig;
pub use crate::session::Session;

// Auth
pub use crate::auth::{ApiClient, Credential, CredentialStore};

// Models
pub use crate::models::{
    FollowEdge, NotificationEvent, NotificationKind, ReportReason, ReportTarget, TargetKind,
};

// Optimistic actions
pub use crate::optimistic::{
    ActionOutcome, FollowIntent, FollowModel, FollowView, Reconciler, ReportIntent, ReportModel,
    ReportView,
};

// Monitor
pub use crate::monitor::{AppLifecycle, MonitorConfig, MonitorState, SessionEvent, TokenMonitor};

// Realtime
pub use crate::realtime::{ConnectionState, NotificationHub, Subscription};

// Errors
pub use crate::error::{Feedback, TetherError, TetherResult};
