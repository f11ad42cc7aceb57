//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`SecureStore`] - key-value secure storage for session secrets
//! - [`HttpClient`] - HTTP client operations (GET, POST, DELETE, streaming)
//! - [`TokenRefresher`] - exchanges a refresh token for a new credential
//! - [`RemoteMutation`] - server side of an optimistic action
//! - [`RealtimeTransport`] - opens a push-notification connection
//! - [`Clock`] - wall-clock time source

pub mod clock;
pub mod http;
pub mod mutation;
pub mod realtime;
pub mod refresh;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
pub use mutation::RemoteMutation;
pub use realtime::{FrameStream, RealtimeTransport};
pub use refresh::TokenRefresher;
pub use store::{SecureStore, StoreError};
