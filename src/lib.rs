//! tether - session keeping and optimistic sync for a social backend client
//!
//! The crate keeps a local session with a REST backend alive, applies
//! follow and report actions optimistically while reconciling them against
//! the server, and delivers realtime notifications to subscribers.
//!
//! - [`session::Session`] wires everything together
//! - [`optimistic::Reconciler`] applies actions locally and rolls back on failure
//! - [`monitor::TokenMonitor`] refreshes the access token before it expires
//! - [`realtime::NotificationListener`] keeps the push channel open

pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod optimistic;
pub mod prelude;
pub mod realtime;
pub mod session;
pub mod traits;
