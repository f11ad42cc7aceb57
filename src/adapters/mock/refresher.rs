//! Scripted token refresher for testing the monitor.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use crate::auth::Credential;
use crate::error::{AuthError, TetherResult};
use crate::traits::TokenRefresher;

#[derive(Debug, Clone)]
enum Scripted {
    Ok(Credential),
    Rejected(u16),
    Transient,
}

#[derive(Default)]
struct State {
    outcomes: VecDeque<Scripted>,
    calls: Vec<String>,
}

/// [`TokenRefresher`] whose results are scripted by the test.
///
/// With nothing queued a call fails with a transient error, so an
/// unexpected refresh shows up as a failed assertion rather than a hang.
#[derive(Clone)]
pub struct ScriptedRefresher {
    state: Arc<Mutex<State>>,
    held: Arc<AtomicBool>,
    gate: Arc<Semaphore>,
    called: Arc<Notify>,
}

impl Default for ScriptedRefresher {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRefresher {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            held: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Semaphore::new(0)),
            called: Arc::new(Notify::new()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Next call returns `credential`.
    pub fn push_ok(&self, credential: Credential) {
        self.state().outcomes.push_back(Scripted::Ok(credential));
    }

    /// Next call is rejected by the server with `status` (401/403 mean the
    /// refresh token is no longer valid).
    pub fn push_rejected(&self, status: u16) {
        self.state().outcomes.push_back(Scripted::Rejected(status));
    }

    /// Next call fails with a retryable transport error.
    pub fn push_transient(&self) {
        self.state().outcomes.push_back(Scripted::Transient);
    }

    /// Make every following call wait for [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Refresh tokens passed in, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
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
impl TokenRefresher for ScriptedRefresher {
    async fn refresh(&self, refresh_token: &str) -> TetherResult<Credential> {
        self.state().calls.push(refresh_token.to_string());
        self.called.notify_waiters();

        if self.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        let next = self.state().outcomes.pop_front();
        match next {
            Some(Scripted::Ok(credential)) => Ok(credential),
            Some(Scripted::Rejected(status)) if status == 401 || status == 403 => {
                Err(AuthError::RefreshTokenInvalid {
                    message: format!("scripted rejection ({})", status),
                }
                .into())
            }
            Some(Scripted::Rejected(status)) => Err(AuthError::RefreshFailed {
                message: format!("scripted server error ({})", status),
            }
            .into()),
            Some(Scripted::Transient) | None => Err(AuthError::RefreshFailed {
                message: "scripted transport failure".to_string(),
            }
            .into()),
        }
    }
}
