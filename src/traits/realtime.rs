//! Realtime transport trait abstraction.
//!
//! A transport opens one connection to a push channel and yields its text
//! frames. Reconnecting is the caller's job.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::http::Headers;
use crate::error::StreamError;

/// Text frames received on an open connection.
///
/// The stream ends when the connection closes cleanly. A close initiated by
/// the server is yielded as [`StreamError::ServerClosed`] first.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

/// Trait for opening a realtime connection.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Connect to `url`, sending `headers` with the handshake.
    async fn connect(&self, url: &str, headers: &Headers) -> Result<FrameStream, StreamError>;
}
