//! Scripted remote mutations for testing the reconciler.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use crate::error::{NetworkError, TetherResult};
use crate::optimistic::OptimisticModel;
use crate::traits::RemoteMutation;

/// What the next scripted call should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Return `Ok(())`.
    Succeed,
    /// Fail as if the server answered with this status.
    FailStatus(u16),
    /// Fail as if the server could not be reached.
    FailConnection,
}

struct Script<M: OptimisticModel> {
    outcomes: VecDeque<MutationOutcome>,
    fallback: MutationOutcome,
    calls: Vec<(M::Key, M::Intent)>,
}

/// [`RemoteMutation`] whose results are scripted by the test.
///
/// Calls are recorded as soon as they start. After [`hold`](Self::hold),
/// each call blocks until [`release`](Self::release) lets it through,
/// which is how tests keep an action "in flight".
///
/// # Example
///
/// ```ignore
/// let remote = ScriptedMutation::<FollowModel>::new();
/// remote.hold();
/// remote.push(MutationOutcome::FailStatus(500));
///
/// let reconciler = Reconciler::new(Arc::new(remote.clone()));
/// // ... dispatch, then
/// remote.wait_for_calls(1).await;
/// remote.release(1);
/// ```
pub struct ScriptedMutation<M: OptimisticModel> {
    script: Arc<Mutex<Script<M>>>,
    held: Arc<AtomicBool>,
    gate: Arc<Semaphore>,
    called: Arc<Notify>,
}

impl<M: OptimisticModel> Clone for ScriptedMutation<M> {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
            held: Arc::clone(&self.held),
            gate: Arc::clone(&self.gate),
            called: Arc::clone(&self.called),
        }
    }
}

impl<M: OptimisticModel> Default for ScriptedMutation<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: OptimisticModel> ScriptedMutation<M> {
    /// Create a mutation that succeeds unless scripted otherwise.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                outcomes: VecDeque::new(),
                fallback: MutationOutcome::Succeed,
                calls: Vec::new(),
            })),
            held: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Semaphore::new(0)),
            called: Arc::new(Notify::new()),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script<M>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the outcome of a future call. Queued outcomes are used in order.
    pub fn push(&self, outcome: MutationOutcome) {
        self.script().outcomes.push_back(outcome);
    }

    /// Outcome used once the queue is empty.
    pub fn set_fallback(&self, outcome: MutationOutcome) {
        self.script().fallback = outcome;
    }

    /// Make every following call wait for [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let `n` held calls complete.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Every `(key, intent)` executed so far, in call order.
    pub fn calls(&self) -> Vec<(M::Key, M::Intent)> {
        self.script().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script().calls.len()
    }

    /// Wait until at least `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let notified = self.called.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.call_count() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl<M: OptimisticModel> RemoteMutation<M> for ScriptedMutation<M> {
    async fn execute(&self, key: &M::Key, intent: &M::Intent) -> TetherResult<()> {
        self.script().calls.push((key.clone(), intent.clone()));
        self.called.notify_waiters();

        if self.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        let outcome = {
            let mut script = self.script();
            let fallback = script.fallback;
            script.outcomes.pop_front().unwrap_or(fallback)
        };

        match outcome {
            MutationOutcome::Succeed => Ok(()),
            MutationOutcome::FailStatus(status) => Err(NetworkError::HttpStatus {
                status,
                message: format!("scripted failure for {}", key),
            }
            .into()),
            MutationOutcome::FailConnection => Err(NetworkError::ConnectionFailed {
                url: format!("mock://{}", key),
                message: "scripted connection failure".to_string(),
            }
            .into()),
        }
    }
}
