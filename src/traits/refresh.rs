//! Token refresh trait abstraction.

use async_trait::async_trait;

use crate::auth::Credential;
use crate::error::TetherResult;

/// Exchanges a refresh token for a fresh credential.
///
/// [`crate::auth::ApiClient`] is the production implementation; the token
/// monitor only depends on this trait so tests can script refresh outcomes.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Perform the refresh. Implementations must not persist the result;
    /// the caller decides when to store it.
    async fn refresh(&self, refresh_token: &str) -> TetherResult<Credential>;
}
