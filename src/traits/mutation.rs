//! Remote side of an optimistic action.

use async_trait::async_trait;

use crate::error::TetherResult;
use crate::optimistic::OptimisticModel;

/// Sends one intent for one key to the server.
///
/// The reconciler calls this at most once at a time per key. A returned
/// error rolls the key's local value back.
#[async_trait]
pub trait RemoteMutation<M: OptimisticModel>: Send + Sync {
    /// Execute `intent` against `key` on the server.
    async fn execute(&self, key: &M::Key, intent: &M::Intent) -> TetherResult<()>;
}
