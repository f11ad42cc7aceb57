//! Session credentials and the REST client that manages them.
//!
//! - Credential storage over a [`crate::traits::SecureStore`]
//! - REST client for auth endpoints and remote mutations
//! - JWT expiry decoding

pub mod api;
pub mod credentials;
pub mod jwt;

pub use api::{ApiClient, TokenResponse};
pub use credentials::{keys, Credential, CredentialStore};
