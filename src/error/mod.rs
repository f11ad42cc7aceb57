//! Unified error handling for tether.
//!
//! - **Error Categories**: classification for handling decisions
//! - **Domain-specific Errors**: Network, Auth, Stream errors
//! - **Unified Error Type**: `TetherError` consolidates all error types
//! - **Feedback**: how a failure is surfaced to the user
//!
//! | Category | Description | Surfaced as |
//! |----------|-------------|-------------|
//! | Network | Connection, DNS, timeout | retried on next check/action |
//! | Auth | 401, expired session | navigation to login |
//! | Validation | Bad credentials, malformed input | toast |
//! | Server | Backend 5xx | retried / silent rollback |

mod auth;
mod category;
mod feedback;
mod network;
mod result;
mod stream;
mod tether_error;

pub use auth::AuthError;
pub use category::ErrorCategory;
pub use feedback::{ActionOrigin, Feedback};
pub use network::NetworkError;
pub use result::TetherResult;
pub use stream::StreamError;
pub use tether_error::TetherError;
