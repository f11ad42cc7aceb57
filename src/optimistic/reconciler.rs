//! Per-key optimistic reconciler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::OptimisticModel;
use crate::error::{ActionOrigin, Feedback, TetherResult};
use crate::traits::RemoteMutation;

/// Capacity of the view-change broadcast channel.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// How a dispatched action ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The server accepted the action; the view keeps the new value.
    Committed,
    /// The server rejected the action; the view is back to its prior value.
    /// The feedback says whether the failure needs the user's attention.
    RolledBack(Feedback),
    /// Another call for the same key was in flight. The view was updated and
    /// the intent will be sent once that call resolves, unless the view
    /// already satisfies it by then.
    Queued,
    /// The view already reflected the intent; nothing was sent.
    Unchanged,
}

/// A key's view changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewChange<K, V> {
    pub key: K,
    pub value: V,
}

/// The one remote call in flight for a key.
struct PendingAction<M: OptimisticModel> {
    id: Uuid,
    /// View before this action was applied. Restored on failure.
    prior: M::Value,
    /// View this action produced. Restored on success.
    applied: M::Value,
    /// Latest intent received while this call was in flight.
    queued: Option<M::Intent>,
}

struct Inner<M: OptimisticModel> {
    values: HashMap<M::Key, M::Value>,
    pending: HashMap<M::Key, PendingAction<M>>,
}

enum Step<M: OptimisticModel> {
    Done(ActionOutcome, Option<M::Value>),
    Send(Uuid, M::Value),
}

/// Applies actions locally, sends them to the server, and rolls back the
/// ones the server rejects.
///
/// At most one remote call per key is in flight. Rollback restores the exact
/// snapshot captured before the failed action and issues no compensating
/// request.
///
/// Remote calls run on their own task, so dropping the future returned by
/// [`dispatch`](Self::dispatch) neither cancels the request nor leaves the
/// key stuck.
pub struct Reconciler<M: OptimisticModel> {
    remote: Arc<dyn RemoteMutation<M>>,
    inner: Arc<Mutex<Inner<M>>>,
    changes: broadcast::Sender<ViewChange<M::Key, M::Value>>,
}

impl<M: OptimisticModel> Clone for Reconciler<M> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            inner: Arc::clone(&self.inner),
            changes: self.changes.clone(),
        }
    }
}

impl<M: OptimisticModel> Reconciler<M> {
    pub fn new(remote: Arc<dyn RemoteMutation<M>>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            remote,
            inner: Arc::new(Mutex::new(Inner {
                values: HashMap::new(),
                pending: HashMap::new(),
            })),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<M>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, key: &M::Key, value: M::Value) {
        // No receivers is fine
        let _ = self.changes.send(ViewChange {
            key: key.clone(),
            value,
        });
    }

    /// Current view for `key`. Unknown keys read as the default value.
    pub fn get(&self, key: &M::Key) -> M::Value {
        self.lock().values.get(key).cloned().unwrap_or_default()
    }

    /// Record server-confirmed state for `key`.
    ///
    /// Ignored while a call for the key is in flight, since the result of
    /// that call will decide the view. Returns whether the value was taken.
    pub fn seed(&self, key: M::Key, value: M::Value) -> bool {
        {
            let mut inner = self.lock();
            if inner.pending.contains_key(&key) {
                debug!(key = %key, "Ignoring seed while action in flight");
                return false;
            }
            inner.values.insert(key.clone(), value.clone());
        }
        self.publish(&key, value);
        true
    }

    /// Whether a remote call for `key` is in flight.
    pub fn is_pending(&self, key: &M::Key) -> bool {
        self.lock().pending.contains_key(key)
    }

    /// Number of keys with a remote call in flight.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Subscribe to view changes.
    pub fn changes(&self) -> broadcast::Receiver<ViewChange<M::Key, M::Value>> {
        self.changes.subscribe()
    }

    /// Apply `intent` to `key` and reconcile it with the server.
    ///
    /// Resolves once this action's remote call has resolved, or immediately
    /// when the action was queued or needed no call. Never fails; server
    /// errors become [`ActionOutcome::RolledBack`].
    pub async fn dispatch(&self, key: M::Key, intent: M::Intent) -> ActionOutcome {
        let step: Step<M> = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let current = inner.values.get(&key).cloned().unwrap_or_default();

            if let Some(pending) = inner.pending.get_mut(&key) {
                let next = M::apply(&current, &intent);
                debug!(key = %key, action = %pending.id, ?intent, "Call in flight, queueing intent");
                pending.queued = Some(intent.clone());
                inner.values.insert(key.clone(), next.clone());
                Step::Done(ActionOutcome::Queued, Some(next))
            } else if M::satisfies(&current, &intent) {
                Step::Done(ActionOutcome::Unchanged, None)
            } else {
                let applied = M::apply(&current, &intent);
                let id = Uuid::new_v4();
                inner.pending.insert(
                    key.clone(),
                    PendingAction {
                        id,
                        prior: current,
                        applied: applied.clone(),
                        queued: None,
                    },
                );
                inner.values.insert(key.clone(), applied.clone());
                Step::Send(id, applied)
            }
        };

        match step {
            Step::Done(outcome, changed) => {
                if let Some(value) = changed {
                    self.publish(&key, value);
                }
                outcome
            }
            Step::Send(id, applied) => {
                debug!(key = %key, action = %id, ?intent, "Applied optimistically");
                self.publish(&key, applied);

                let (tx, rx) = oneshot::channel();
                let this = self.clone();
                let driven = key.clone();
                tokio::spawn(async move { this.drive(driven, intent, id, tx).await });
                match rx.await {
                    Ok(outcome) => outcome,
                    // The driver task panicked before resolving the call
                    Err(_) => {
                        self.abandon(&key, id);
                        ActionOutcome::RolledBack(Feedback::Silent)
                    }
                }
            }
        }
    }

    /// Send `intent`, resolve it, then keep going while queued intents need
    /// sending.
    async fn drive(
        self,
        key: M::Key,
        mut intent: M::Intent,
        mut id: Uuid,
        first: oneshot::Sender<ActionOutcome>,
    ) {
        let mut first = Some(first);
        loop {
            let result = self.remote.execute(&key, &intent).await;
            let (outcome, value, next) = self.resolve(&key, id, result);
            self.publish(&key, value);

            if let Some(tx) = first.take() {
                let _ = tx.send(outcome);
            }

            match next {
                Some((next_id, next_intent)) => {
                    id = next_id;
                    intent = next_intent;
                }
                None => break,
            }
        }
    }

    /// Restore the prior view of an action whose driver died, so the key
    /// accepts new actions again.
    fn abandon(&self, key: &M::Key, id: Uuid) {
        let restored = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match inner.pending.get(key) {
                Some(pending) if pending.id == id => {
                    let prior = inner.pending.remove(key).map(|p| p.prior).unwrap_or_default();
                    inner.values.insert(key.clone(), prior.clone());
                    prior
                }
                _ => return,
            }
        };
        error!(key = %key, action = %id, "Remote mutation task died, rolling back");
        self.publish(key, restored);
    }

    fn resolve(
        &self,
        key: &M::Key,
        id: Uuid,
        result: TetherResult<()>,
    ) -> (ActionOutcome, M::Value, Option<(Uuid, M::Intent)>) {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let Some(pending) = inner.pending.remove(key) else {
            // Only the driver removes entries, so this is unreachable in practice
            warn!(key = %key, action = %id, "Resolved action was not pending");
            let value = inner.values.get(key).cloned().unwrap_or_default();
            return (ActionOutcome::Committed, value, None);
        };

        let outcome = match result {
            Ok(()) => {
                debug!(key = %key, action = %id, "Committed");
                inner.values.insert(key.clone(), pending.applied);
                ActionOutcome::Committed
            }
            Err(err) => {
                warn!(
                    key = %key,
                    action = %id,
                    code = err.error_code(),
                    category = %err.category(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "Remote mutation failed, rolling back"
                );
                inner.values.insert(key.clone(), pending.prior);
                ActionOutcome::RolledBack(Feedback::for_error(&err, ActionOrigin::Optimistic))
            }
        };

        let current = inner.values.get(key).cloned().unwrap_or_default();
        if let Some(queued) = pending.queued {
            if M::satisfies(&current, &queued) {
                debug!(key = %key, ?queued, "Queued intent already satisfied");
            } else {
                let applied = M::apply(&current, &queued);
                let next_id = Uuid::new_v4();
                debug!(key = %key, action = %next_id, ?queued, "Sending queued intent");
                inner.pending.insert(
                    key.clone(),
                    PendingAction {
                        id: next_id,
                        prior: current,
                        applied: applied.clone(),
                        queued: None,
                    },
                );
                inner.values.insert(key.clone(), applied.clone());
                return (outcome, applied, Some((next_id, queued)));
            }
        }

        (outcome, current, None)
    }
}
