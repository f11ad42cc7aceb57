//! Concrete implementations of trait abstractions.
//!
//! This module provides the production adapters behind the traits defined
//! in `crate::traits`.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`TungsteniteTransport`] - WebSocket transport using tokio-tungstenite
//! - [`FileSecureStore`] - JSON-file secure storage
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles for every trait:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::InMemorySecureStore`] - In-memory secure storage
//! - [`mock::MockTransport`] - Scripted realtime connections
//! - [`mock::ScriptedMutation`] / [`mock::ScriptedRefresher`] - Scripted outcomes
//! - [`mock::ManualClock`] - Controllable wall clock

pub mod file_store;
pub mod mock;
pub mod reqwest_http;
pub mod tungstenite_ws;

pub use file_store::FileSecureStore;
pub use reqwest_http::ReqwestHttpClient;
pub use tungstenite_ws::TungsteniteTransport;
