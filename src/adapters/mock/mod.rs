//! Mock implementations for testing.
//!
//! This module provides mock implementations of all trait abstractions,
//! enabling unit testing without network dependencies or file system access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses
//! - [`InMemorySecureStore`] - In-memory secure storage with failure injection
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`ScriptedMutation`] - Remote mutation with scripted outcomes
//! - [`ScriptedRefresher`] - Token refresher with scripted outcomes
//! - [`MockTransport`] - Realtime transport with scripted connections

pub mod clock;
pub mod http;
pub mod mutation;
pub mod refresher;
pub mod store;
pub mod transport;

pub use clock::ManualClock;
pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use mutation::{MutationOutcome, ScriptedMutation};
pub use refresher::ScriptedRefresher;
pub use store::InMemorySecureStore;
pub use transport::{MockTransport, RecordedConnect};
