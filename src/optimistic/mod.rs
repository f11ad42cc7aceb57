//! Optimistic client-state synchronization.
//!
//! A user action changes the local view at once, then the matching remote
//! mutation runs. If the server rejects it, the view goes back to exactly
//! what it was before that action. Errors are logged and reported as an
//! [`ActionOutcome`], never returned.
//!
//! Actions are serialized per key: while one remote call for a key is in
//! flight, later actions on the same key update the view and wait as a
//! single queued intent (latest wins). See [`Reconciler`].

pub mod follow;
pub mod reconciler;
pub mod report;

pub use follow::{FollowIntent, FollowModel, FollowView};
pub use reconciler::{ActionOutcome, Reconciler, ViewChange};
pub use report::{ReportIntent, ReportModel, ReportView};

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Describes one kind of optimistically-updated state.
///
/// `Value` is what the user sees for a key. `Intent` is what they asked
/// for. Both functions must be pure.
pub trait OptimisticModel: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Display + Debug + Send + Sync + 'static;
    type Value: Clone + PartialEq + Debug + Default + Send + Sync + 'static;
    type Intent: Clone + Debug + Send + Sync + 'static;

    /// The view after `intent` has been applied to `current`.
    fn apply(current: &Self::Value, intent: &Self::Intent) -> Self::Value;

    /// Whether `current` already reflects `intent`, so no remote call is
    /// needed.
    fn satisfies(current: &Self::Value, intent: &Self::Intent) -> bool;
}
