//! The session context object.
//!
//! A [`Session`] owns every long-lived piece of client state: the credential
//! store, the API client, the optimistic reconcilers, the token monitor and
//! the notification channel. Components receive what they need from it
//! instead of reaching for globals, and its background work runs between
//! [`Session::start`] and [`Session::shutdown`].

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::adapters::{FileSecureStore, ReqwestHttpClient, TungsteniteTransport};
use crate::auth::{ApiClient, Credential, CredentialStore};
use crate::config::ClientConfig;
use crate::error::TetherResult;
use crate::monitor::{AppLifecycle, MonitorState, TokenMonitor};
use crate::optimistic::{FollowModel, Reconciler, ReportModel};
use crate::realtime::{
    ChannelSource, ConnectionState, ListenerHandle, NotificationHub, NotificationListener,
    Subscription,
};
use crate::traits::{HttpClient, RealtimeTransport, SecureStore};

/// Client state for one signed-in (or signing-in) user.
///
/// # Example
///
/// ```ignore
/// use tether::{config::ClientConfig, session::Session};
///
/// let session = Session::new(ClientConfig::from_env()?)?;
/// session.login("ana@example.com", "secret").await?;
/// session.start();
///
/// let mut notifications = session.subscribe();
/// while let Some(event) = notifications.recv().await {
///     println!("{}", event);
/// }
/// session.shutdown().await;
/// ```
pub struct Session {
    config: ClientConfig,
    credentials: CredentialStore,
    api: ApiClient,
    follows: Reconciler<FollowModel>,
    reports: Reconciler<ReportModel>,
    monitor: TokenMonitor,
    hub: NotificationHub,
    channel: ChannelSource,
    lifecycle: watch::Sender<AppLifecycle>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl Session {
    /// Session with the production adapters: a file-backed store at
    /// `config.store_path`, reqwest for HTTP, and tungstenite when a
    /// WebSocket URL is configured.
    pub fn new(config: ClientConfig) -> TetherResult<Self> {
        let store = Arc::new(FileSecureStore::at_path(config.store_path.clone()));
        let transport: Option<Arc<dyn RealtimeTransport>> = config
            .ws_url
            .as_ref()
            .map(|_| Arc::new(TungsteniteTransport::new()) as Arc<dyn RealtimeTransport>);
        Ok(Self::from_parts(
            config,
            store,
            Arc::new(ReqwestHttpClient::new()),
            transport,
        ))
    }

    /// Session over explicit adapters.
    ///
    /// Notifications use `transport` when both it and `config.ws_url` are
    /// present, and SSE over `http` otherwise.
    pub fn from_parts(
        config: ClientConfig,
        store: Arc<dyn SecureStore>,
        http: Arc<dyn HttpClient>,
        transport: Option<Arc<dyn RealtimeTransport>>,
    ) -> Self {
        let credentials = CredentialStore::new(store);
        let api = ApiClient::new(config.api_url.clone(), Arc::clone(&http), credentials.clone());
        let follows = Reconciler::new(Arc::new(api.clone()));
        let reports = Reconciler::new(Arc::new(api.clone()));
        let monitor = TokenMonitor::new(
            credentials.clone(),
            Arc::new(api.clone()),
            config.monitor_config(),
        );

        let channel = match (transport, config.ws_url.clone()) {
            (Some(transport), Some(url)) => ChannelSource::WebSocket { transport, url },
            _ => ChannelSource::Sse {
                http,
                url: config.sse_url(),
            },
        };
        debug!(channel = ?channel, "Session created");

        let (lifecycle, _) = watch::channel(AppLifecycle::Foreground);

        Self {
            config,
            credentials,
            api,
            follows,
            reports,
            monitor,
            hub: NotificationHub::new(),
            channel,
            lifecycle,
            listener: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Optimistic follow state, one entry per edge.
    pub fn follows(&self) -> &Reconciler<FollowModel> {
        &self.follows
    }

    /// Optimistic report state, one entry per reported item.
    pub fn reports(&self) -> &Reconciler<ReportModel> {
        &self.reports
    }

    pub fn monitor(&self) -> &TokenMonitor {
        &self.monitor
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Receive notifications delivered from now on.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    /// Report a foreground/background transition.
    pub fn set_lifecycle(&self, lifecycle: AppLifecycle) {
        self.lifecycle.send_replace(lifecycle);
    }

    /// Realtime connection state, or `None` if the listener is not running.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.lock_listener().as_ref().map(ListenerHandle::state)
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<ListenerHandle>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the token monitor and the notification listener. Calling it
    /// again while running does nothing.
    pub fn start(&self) {
        self.monitor.start(self.lifecycle.subscribe());

        let mut listener = self.lock_listener();
        if listener.is_none() {
            let handle = NotificationListener::new(
                self.channel.clone(),
                self.credentials.clone(),
                self.hub.clone(),
            )
            .spawn();
            *listener = Some(handle);
            info!("Session started");
        }
    }

    /// Stop all background work. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.monitor.stop().await;
        let listener = self.lock_listener().take();
        if let Some(handle) = listener {
            if let Err(e) = handle.stop().await {
                debug!(error = %e, "Listener ended with error");
            }
        }
        info!("Session shut down");
    }

    /// Sign in and store the new credential.
    pub async fn login(&self, email: &str, password: &str) -> TetherResult<Credential> {
        self.api.login(email, password).await
    }

    /// Sign out. Local credentials are cleared even if the server call
    /// fails.
    pub async fn logout(&self) -> TetherResult<()> {
        self.api.logout().await
    }

    pub fn is_running(&self) -> bool {
        self.monitor.state() != MonitorState::Stopped || self.lock_listener().is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api_url", &self.config.api_url)
            .field("channel", &self.channel)
            .field("monitor", &self.monitor.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemorySecureStore, MockHttpClient, MockResponse, MockTransport};
    use crate::models::{FollowEdge, NotificationEvent};
    use crate::optimistic::{ActionOutcome, FollowView};
    use crate::traits::Response;
    use bytes::Bytes;
    use chrono::Utc;

    fn config() -> ClientConfig {
        ClientConfig::new("https://api.example.com")
            .unwrap()
            .with_store_path("/nonexistent/never-used.json")
    }

    async fn signed_in_store() -> Arc<InMemorySecureStore> {
        let store = Arc::new(InMemorySecureStore::new());
        CredentialStore::new(store.clone())
            .save_credential(
                &Credential::new("tok", Utc::now() + chrono::Duration::hours(1))
                    .with_refresh_token("r1")
                    .with_user_id("me"),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_sse_channel_without_ws_url() {
        let session = Session::from_parts(
            config(),
            Arc::new(InMemorySecureStore::new()),
            Arc::new(MockHttpClient::new()),
            Some(Arc::new(MockTransport::new())),
        );
        assert!(matches!(
            &session.channel,
            ChannelSource::Sse { url, .. } if url == "https://api.example.com/notifications/stream"
        ));
    }

    #[tokio::test]
    async fn test_websocket_channel_with_ws_url() {
        let session = Session::from_parts(
            config().with_ws_url("wss://push.example.com/ws"),
            Arc::new(InMemorySecureStore::new()),
            Arc::new(MockHttpClient::new()),
            Some(Arc::new(MockTransport::new())),
        );
        assert_eq!(session.channel.url(), "wss://push.example.com/ws");
    }

    #[tokio::test]
    async fn test_follow_goes_through_api() {
        let http = MockHttpClient::new();
        http.set_method_response(
            "POST",
            "https://api.example.com/users/42/follow",
            MockResponse::Success(Response::new(200, Bytes::from("{}"))),
        );
        let session = Session::from_parts(
            config(),
            signed_in_store().await,
            Arc::new(http.clone()),
            None,
        );
        let edge = FollowEdge::user("me", "42");
        session.follows().seed(edge.clone(), FollowView::new(false, 3));

        assert_eq!(session.follows().follow(edge.clone()).await, ActionOutcome::Committed);
        assert_eq!(session.follows().get(&edge), FollowView::new(true, 4));
        assert_eq!(
            http.get_requests()[0].headers.get("Authorization").unwrap(),
            "Bearer tok"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_delivers_notifications_and_shutdown_stops() {
        let transport = MockTransport::new();
        let live = transport.push_live();
        let session = Session::from_parts(
            config().with_ws_url("wss://push.example.com/ws"),
            signed_in_store().await,
            Arc::new(MockHttpClient::new()),
            Some(Arc::new(transport.clone())),
        );
        let mut notifications = session.subscribe();

        session.start();
        session.start();
        assert!(session.is_running());

        live.send(Ok(r#"{"id": "n1", "recipient_id": "me", "kind": "like"}"#.to_string()))
            .unwrap();
        let event: NotificationEvent = notifications.recv().await.unwrap();
        assert_eq!(event.id, "n1");
        assert_eq!(transport.connect_count(), 1);

        session.set_lifecycle(AppLifecycle::Background);
        session.shutdown().await;
        assert_eq!(session.monitor().state(), MonitorState::Stopped);
        assert!(session.connection_state().is_none());
        assert!(!session.is_running());
    }
}
