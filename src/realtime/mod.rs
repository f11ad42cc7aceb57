//! Realtime push notifications.
//!
//! - [`NotificationListener`] keeps an SSE or WebSocket channel open and
//!   reconnects with [`ExponentialBackoff`]
//! - [`NotificationHub`] fans notifications out to [`Subscription`]s
//! - [`SseParser`] and [`parse_frame`] decode the wire formats

pub mod backoff;
pub mod events;
pub mod hub;
pub mod listener;
pub mod sse;

pub use backoff::ExponentialBackoff;
pub use events::{parse_frame, parse_message, RealtimeMessage};
pub use hub::{NotificationHub, Subscription, DEFAULT_HUB_CAPACITY};
pub use listener::{ChannelSource, ConnectionState, ListenerConfig, ListenerHandle, NotificationListener};
pub use sse::{decode_sse, parse_sse_line, MessageStream, SseLine, SseParser};
