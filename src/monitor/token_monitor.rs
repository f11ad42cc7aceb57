//! Background token refresh.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::state::{AppLifecycle, CheckOutcome, MonitorConfig, MonitorState, SessionEvent};
use crate::auth::CredentialStore;
use crate::traits::{Clock, SystemClock, TokenRefresher};

const EVENT_CAPACITY: usize = 16;

struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct Inner {
    credentials: CredentialStore,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    refreshing: AtomicBool,
    /// Set once `LoginRequired` went out for the current signed-out period.
    signed_out: AtomicBool,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
    state: watch::Sender<MonitorState>,
    events: broadcast::Sender<SessionEvent>,
    running: Mutex<Option<Running>>,
}

/// Keeps the stored access token fresh.
///
/// While running and foregrounded it checks every `check_interval` whether
/// the token expires within `buffer_time`, and if so exchanges the refresh
/// token for a new credential. Backgrounding pauses the timer; coming back
/// to the foreground checks immediately.
///
/// Cloning is cheap; clones share state.
///
/// # Example
///
/// ```ignore
/// let monitor = TokenMonitor::new(credentials, Arc::new(api), MonitorConfig::default());
/// let (lifecycle_tx, lifecycle_rx) = watch::channel(AppLifecycle::Foreground);
/// monitor.start(lifecycle_rx);
///
/// let mut events = monitor.subscribe();
/// if let Ok(SessionEvent::LoginRequired) = events.recv().await {
///     // show the login screen
/// }
/// monitor.stop().await;
/// ```
#[derive(Clone)]
pub struct TokenMonitor {
    inner: Arc<Inner>,
}

impl TokenMonitor {
    pub fn new(
        credentials: CredentialStore,
        refresher: Arc<dyn TokenRefresher>,
        config: MonitorConfig,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Stopped);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                credentials,
                refresher,
                clock: Arc::new(SystemClock),
                config,
                refreshing: AtomicBool::new(false),
                signed_out: AtomicBool::new(false),
                last_refresh: Mutex::new(None),
                state,
                events,
                running: Mutex::new(None),
            }),
        }
    }

    /// Use `clock` for expiry checks. Must be called before the monitor is
    /// shared.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.clock = clock,
            None => warn!("Monitor already shared, clock not replaced"),
        }
        self
    }

    pub fn config(&self) -> MonitorConfig {
        self.inner.config
    }

    pub fn state(&self) -> MonitorState {
        *self.inner.state.borrow()
    }

    /// Watch receiver for state changes
    pub fn state_receiver(&self) -> watch::Receiver<MonitorState> {
        self.inner.state.subscribe()
    }

    /// Receive session events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.inner.running.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: MonitorState) {
        self.inner.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(from = %current, to = %state, "Monitor state changed");
                *current = state;
                true
            }
        });
    }

    /// Start the background timer. Returns `false` if already running.
    ///
    /// `lifecycle` reports foreground/background transitions. The first
    /// check happens right away when starting in the foreground.
    pub fn start(&self, lifecycle: watch::Receiver<AppLifecycle>) -> bool {
        let mut running = self.lock_running();
        if running.is_some() {
            return false;
        }

        let initial = if *lifecycle.borrow() == AppLifecycle::Background {
            MonitorState::Paused
        } else {
            MonitorState::Monitoring
        };
        self.set_state(initial);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let monitor = self.clone();
        let task = tokio::spawn(async move { monitor.run(lifecycle, shutdown_rx).await });

        *running = Some(Running { shutdown, task });
        info!(
            buffer_secs = self.inner.config.buffer_time.as_secs(),
            interval_secs = self.inner.config.check_interval.as_secs(),
            "Token monitor started"
        );
        true
    }

    /// Stop the timer and wait for the background task to exit. A refresh
    /// already in flight is allowed to finish.
    pub async fn stop(&self) {
        let running = self.lock_running().take();
        if let Some(Running { shutdown, task }) = running {
            let _ = shutdown.send(true);
            if let Err(e) = task.await {
                warn!(error = %e, "Token monitor task ended abnormally");
            }
            info!("Token monitor stopped");
        }
        self.set_state(MonitorState::Stopped);
    }

    async fn run(
        &self,
        mut lifecycle: watch::Receiver<AppLifecycle>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(self.inner.config.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut foreground = *lifecycle.borrow_and_update() == AppLifecycle::Foreground;
        let mut lifecycle_open = true;

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = interval.tick(), if foreground => {
                    self.check_and_refresh_token().await;
                }
                changed = lifecycle.changed(), if lifecycle_open => {
                    if changed.is_err() {
                        debug!("Lifecycle source dropped, keeping current mode");
                        lifecycle_open = false;
                        continue;
                    }
                    let now_foreground = *lifecycle.borrow_and_update() == AppLifecycle::Foreground;
                    if now_foreground == foreground {
                        continue;
                    }
                    foreground = now_foreground;
                    if foreground {
                        debug!("App foregrounded, checking token");
                        self.set_state(MonitorState::Monitoring);
                        self.check_and_refresh_token().await;
                        interval.reset();
                    } else {
                        debug!("App backgrounded, pausing token checks");
                        self.set_state(MonitorState::Paused);
                    }
                }
            }
        }
    }

    /// Check the stored credential and refresh it if it expires within the
    /// buffer window.
    ///
    /// Never fails: transient errors leave the session as it is for the
    /// next cycle, and an invalid session ends in
    /// [`CheckOutcome::Unauthenticated`] with [`SessionEvent::LoginRequired`].
    pub async fn check_and_refresh_token(&self) -> CheckOutcome {
        let inner = &self.inner;
        if inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already in progress");
            return CheckOutcome::AlreadyRefreshing;
        }
        let _guard = RefreshingGuard(&inner.refreshing);

        let credential = match inner.credentials.load_credential().await {
            Ok(Some(credential)) if credential.can_refresh() => credential,
            Ok(_) => {
                self.enter_unauthenticated();
                return CheckOutcome::Unauthenticated;
            }
            Err(e) => {
                warn!(error = %e, "Could not read credentials, will retry");
                return CheckOutcome::Failed;
            }
        };

        // A session is back (new login); resume normal monitoring
        inner.signed_out.store(false, Ordering::Release);
        let resting = match self.state() {
            MonitorState::Unauthenticated | MonitorState::Refreshing => MonitorState::Monitoring,
            other => other,
        };
        self.set_state(resting);

        let now = inner.clock.now();
        let buffer = inner.config.buffer();
        if !credential.expires_within(now, buffer) {
            return CheckOutcome::Fresh;
        }

        let last_refresh = *inner.last_refresh.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = last_refresh {
            if now - last < buffer {
                debug!(last_refresh = %last, "Refreshed recently, skipping");
                return CheckOutcome::Throttled;
            }
        }

        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            self.enter_unauthenticated();
            return CheckOutcome::Unauthenticated;
        };

        self.set_state(MonitorState::Refreshing);
        debug!(expires_at = %credential.expires_at, "Token inside refresh window, refreshing");

        match inner.refresher.refresh(refresh_token).await {
            Ok(mut refreshed) => {
                if refreshed.user_id.is_none() {
                    refreshed.user_id = credential.user_id.clone();
                }
                if let Err(e) = inner.credentials.save_credential(&refreshed).await {
                    warn!(error = %e, "Refreshed token could not be stored");
                    self.set_state(resting);
                    return CheckOutcome::Failed;
                }
                *inner.last_refresh.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);
                info!(expires_at = %refreshed.expires_at, "Access token refreshed");
                let _ = inner.events.send(SessionEvent::Refreshed {
                    expires_at: refreshed.expires_at,
                });
                self.set_state(resting);
                CheckOutcome::Refreshed
            }
            Err(e) if e.requires_reauth() => {
                info!(error = %e, "Session no longer valid, signing out");
                if let Err(e) = inner.credentials.clear().await {
                    warn!(error = %e, "Could not clear credentials");
                }
                self.enter_unauthenticated();
                CheckOutcome::Unauthenticated
            }
            Err(e) => {
                warn!(
                    error = %e,
                    code = e.error_code(),
                    category = %e.category(),
                    "Token refresh failed, will retry"
                );
                self.set_state(resting);
                CheckOutcome::Failed
            }
        }
    }

    fn enter_unauthenticated(&self) {
        self.set_state(MonitorState::Unauthenticated);
        if !self.inner.signed_out.swap(true, Ordering::AcqRel) {
            info!("No refreshable session, login required");
            let _ = self.inner.events.send(SessionEvent::LoginRequired);
        }
    }
}

impl std::fmt::Debug for TokenMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMonitor")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Clears the refreshing flag when a check ends, including by cancellation.
struct RefreshingGuard<'a>(&'a AtomicBool);

impl Drop for RefreshingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
