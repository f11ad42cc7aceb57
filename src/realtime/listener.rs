//! Background listener that keeps the realtime channel open.
//!
//! The listener connects over SSE or WebSocket, publishes every notification
//! addressed to the signed-in user to a [`NotificationHub`], and reconnects
//! with exponential backoff when the channel drops. The access token is read
//! from the credential store on every connect, so a token refreshed by the
//! monitor is picked up on the next reconnect.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backoff::ExponentialBackoff;
use super::events::{parse_frame, RealtimeMessage};
use super::hub::NotificationHub;
use super::sse::{decode_sse, MessageStream};
use crate::auth::CredentialStore;
use crate::error::StreamError;
use crate::traits::{Headers, HttpClient, RealtimeTransport};

/// Where notifications come from.
#[derive(Clone)]
pub enum ChannelSource {
    /// Server-Sent Events over a long-lived GET.
    Sse {
        http: Arc<dyn HttpClient>,
        url: String,
    },
    /// JSON text frames over a WebSocket.
    WebSocket {
        transport: Arc<dyn RealtimeTransport>,
        url: String,
    },
}

impl ChannelSource {
    pub fn url(&self) -> &str {
        match self {
            ChannelSource::Sse { url, .. } | ChannelSource::WebSocket { url, .. } => url,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ChannelSource::Sse { .. } => "sse",
            ChannelSource::WebSocket { .. } => "websocket",
        }
    }
}

impl std::fmt::Debug for ChannelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.url())
    }
}

/// Reconnect settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Give up after this many consecutive failures. `None` retries forever.
    pub max_retries: Option<u32>,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Realtime connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Waiting before reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
    Stopped,
}

/// Connects a [`ChannelSource`] to a [`NotificationHub`].
pub struct NotificationListener {
    source: ChannelSource,
    credentials: CredentialStore,
    hub: NotificationHub,
    config: ListenerConfig,
}

impl NotificationListener {
    pub fn new(source: ChannelSource, credentials: CredentialStore, hub: NotificationHub) -> Self {
        Self {
            source,
            credentials,
            hub,
            config: ListenerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ListenerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start listening on a background task.
    pub fn spawn(self) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let task = tokio::spawn(async move { self.run(shutdown_rx, state_tx).await });

        ListenerHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            task: Some(task),
        }
    }

    async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Result<(), StreamError> {
        let mut backoff =
            ExponentialBackoff::with_config(self.config.base_backoff, self.config.max_backoff);

        let result = loop {
            if *shutdown.borrow() {
                break Ok(());
            }

            let opened = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break Ok(()),
                opened = self.open() => opened,
            };

            match opened {
                Ok((stream, user_id)) => {
                    info!(source = ?self.source, "Realtime channel connected");
                    backoff.reset();
                    let _ = state_tx.send(ConnectionState::Connected);

                    let reason = tokio::select! {
                        _ = wait_for_shutdown(&mut shutdown) => break Ok(()),
                        reason = self.pump(stream, user_id) => reason,
                    };
                    warn!(error = %reason, "Realtime channel dropped");
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt = backoff.failure_count() + 1,
                        "Realtime connect failed"
                    );
                }
            }

            let delay = backoff.record_failure();
            let failures = backoff.failure_count();
            if let Some(max) = self.config.max_retries {
                if failures >= max {
                    error!(attempts = failures, "Giving up on realtime channel");
                    break Err(StreamError::RetriesExhausted { attempts: failures });
                }
            }

            let _ = state_tx.send(ConnectionState::Reconnecting { attempt: failures });
            debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnect");

            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        };

        info!("Realtime listener stopped");
        let _ = state_tx.send(ConnectionState::Stopped);
        result
    }

    /// Open one connection. Returns the decoded message stream and the
    /// user the notifications are filtered for.
    async fn open(&self) -> Result<(MessageStream, Option<String>), StreamError> {
        let url = self.source.url();
        let connect_failed = |message: String| StreamError::ConnectFailed {
            url: url.to_string(),
            message,
        };

        let credential = self
            .credentials
            .load_credential()
            .await
            .map_err(|e| connect_failed(e.to_string()))?
            .ok_or_else(|| connect_failed("not signed in".to_string()))?;

        let mut headers = Headers::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", credential.access_token),
        );

        let stream: MessageStream = match &self.source {
            ChannelSource::Sse { http, url } => {
                headers.insert("Accept".to_string(), "text/event-stream".to_string());
                let body = http
                    .get_stream(url, &headers)
                    .await
                    .map_err(|e| connect_failed(e.to_string()))?;
                decode_sse(body)
            }
            ChannelSource::WebSocket { transport, url } => {
                let frames = transport.connect(url, &headers).await?;
                frames
                    .map(|frame| frame.and_then(|text| parse_frame(&text)))
                    .boxed()
            }
        };

        Ok((stream, credential.user_id))
    }

    /// Forward notifications until the connection drops. Returns why it
    /// dropped.
    async fn pump(&self, mut stream: MessageStream, mut user_id: Option<String>) -> StreamError {
        while let Some(item) = stream.next().await {
            match item {
                Ok(RealtimeMessage::Notification(event)) => {
                    if event.is_for(user_id.as_deref()) {
                        let delivered = self.hub.publish(event);
                        debug!(subscribers = delivered, "Notification published");
                    } else {
                        debug!(id = %event.id, "Skipping notification for another user");
                    }
                }
                Ok(RealtimeMessage::Connected { user_id: server_user }) => {
                    debug!(user_id = ?server_user, "Channel acknowledged");
                    if user_id.is_none() {
                        user_id = server_user;
                    }
                }
                Ok(RealtimeMessage::Ping) => {}
                Ok(RealtimeMessage::Unknown(event_type)) => {
                    debug!(event_type = %event_type, "Ignoring unknown realtime event");
                }
                Err(e) if e.should_reconnect() => return e,
                Err(e) => warn!(error = %e, "Skipping malformed realtime event"),
            }
        }

        StreamError::ConnectionLost {
            message: "stream ended".to_string(),
        }
    }
}

/// Resolves once shutdown was requested or the handle is gone.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Controls a running [`NotificationListener`]. Dropping the handle stops
/// the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<Result<(), StreamError>>>,
}

impl ListenerHandle {
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Watch receiver for connection state changes
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stop the listener and wait for it to exit.
    pub async fn stop(mut self) -> Result<(), StreamError> {
        let _ = self.shutdown.send(true);
        self.join_task().await
    }

    /// Wait for the listener to exit on its own (only happens when retries
    /// are exhausted).
    pub async fn join(mut self) -> Result<(), StreamError> {
        self.join_task().await
    }

    async fn join_task(&mut self) -> Result<(), StreamError> {
        match self.task.take() {
            Some(task) => task.await.unwrap_or_else(|e| {
                Err(StreamError::ConnectionLost {
                    message: e.to_string(),
                })
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemorySecureStore, MockHttpClient, MockResponse, MockTransport};
    use crate::auth::Credential;
    use bytes::Bytes;
    use chrono::Utc;

    const SSE_URL: &str = "https://api.example.com/notifications/stream";
    const WS_URL: &str = "wss://push.example.com/ws";

    async fn signed_in(user_id: Option<&str>) -> CredentialStore {
        let credentials = CredentialStore::new(Arc::new(InMemorySecureStore::new()));
        let mut credential = Credential::new("tok", Utc::now() + chrono::Duration::hours(1));
        if let Some(id) = user_id {
            credential = credential.with_user_id(id);
        }
        credentials.save_credential(&credential).await.unwrap();
        credentials
    }

    fn fast() -> ListenerConfig {
        ListenerConfig {
            max_retries: None,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sse_notifications_reach_subscribers() {
        let http = MockHttpClient::new();
        http.push_response(
            "GET",
            SSE_URL,
            MockResponse::Stream(vec![
                Bytes::from_static(b"event: notification\ndata: {\"id\": \"n1\", \"recipient_id\": \"u2\"}\n\n"),
                Bytes::from_static(b": keepalive\n\nevent: notification\n"),
                Bytes::from_static(b"data: {\"id\": \"n2\", \"recipient_id\": \"u1\", \"message\": \"hi\"}\n\n"),
            ]),
        );
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe();

        let handle = NotificationListener::new(
            ChannelSource::Sse {
                http: Arc::new(http.clone()),
                url: SSE_URL.to_string(),
            },
            signed_in(Some("u1")).await,
            hub,
        )
        .with_config(fast())
        .spawn();

        // n1 is for someone else
        let event = sub.recv().await.unwrap();
        assert_eq!(event.id, "n2");
        assert_eq!(event.message.as_deref(), Some("hi"));

        let request = &http.get_requests()[0];
        assert_eq!(request.headers.get("Authorization").unwrap(), "Bearer tok");
        assert_eq!(request.headers.get("Accept").unwrap(), "text/event-stream");

        assert!(handle.stop().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_websocket_reconnects_after_drop() {
        let transport = MockTransport::new();
        let first = transport.push_live();
        let second = transport.push_live();
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe();

        let handle = NotificationListener::new(
            ChannelSource::WebSocket {
                transport: Arc::new(transport.clone()),
                url: WS_URL.to_string(),
            },
            signed_in(None).await,
            hub,
        )
        .with_config(fast())
        .spawn();

        first.send(Ok(r#"{"type": "notification", "id": "a"}"#.to_string())).unwrap();
        assert_eq!(sub.recv().await.unwrap().id, "a");

        first
            .send(Err(StreamError::ServerClosed { reason: None }))
            .unwrap();
        transport.wait_for_connects(2).await;

        second.send(Ok(r#"{"id": "b"}"#.to_string())).unwrap();
        assert_eq!(sub.recv().await.unwrap().id, "b");

        let connects = transport.connects();
        assert_eq!(connects[1].url, WS_URL);
        assert_eq!(connects[1].headers.get("Authorization").unwrap(), "Bearer tok");

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_user_id_filters_when_none_stored() {
        let transport = MockTransport::new();
        let live = transport.push_live();
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe();

        let handle = NotificationListener::new(
            ChannelSource::WebSocket {
                transport: Arc::new(transport.clone()),
                url: WS_URL.to_string(),
            },
            signed_in(None).await,
            hub,
        )
        .spawn();

        live.send(Ok(r#"{"type": "connected", "user_id": "u1"}"#.to_string()))
            .unwrap();
        live.send(Ok(r#"{"id": "other", "recipient_id": "u9"}"#.to_string()))
            .unwrap();
        live.send(Ok("{not json".to_string())).unwrap();
        live.send(Ok(r#"{"id": "mine", "recipient_id": "u1"}"#.to_string()))
            .unwrap();

        assert_eq!(sub.recv().await.unwrap().id, "mine");
        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_credential_never_connects() {
        let transport = MockTransport::new();
        let credentials = CredentialStore::new(Arc::new(InMemorySecureStore::new()));

        let handle = NotificationListener::new(
            ChannelSource::WebSocket {
                transport: Arc::new(transport.clone()),
                url: WS_URL.to_string(),
            },
            credentials,
            NotificationHub::new(),
        )
        .with_config(ListenerConfig {
            max_retries: Some(3),
            ..fast()
        })
        .spawn();

        assert_eq!(
            handle.join().await,
            Err(StreamError::RetriesExhausted { attempts: 3 })
        );
        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let transport = MockTransport::new();
        let handle = NotificationListener::new(
            ChannelSource::WebSocket {
                transport: Arc::new(transport.clone()),
                url: WS_URL.to_string(),
            },
            signed_in(Some("u1")).await,
            NotificationHub::new(),
        )
        .with_config(ListenerConfig {
            max_retries: Some(2),
            ..fast()
        })
        .spawn();

        let mut state = handle.state_receiver();
        let result = handle.join().await;

        assert_eq!(result, Err(StreamError::RetriesExhausted { attempts: 2 }));
        assert_eq!(transport.connect_count(), 2);
        state.changed().await.ok();
        assert_eq!(*state.borrow(), ConnectionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let transport = MockTransport::new();
        transport.push_failure("refused");
        let _live = transport.push_live();

        let handle = NotificationListener::new(
            ChannelSource::WebSocket {
                transport: Arc::new(transport.clone()),
                url: WS_URL.to_string(),
            },
            signed_in(Some("u1")).await,
            NotificationHub::new(),
        )
        .with_config(fast())
        .spawn();

        let mut state = handle.state_receiver();
        let mut seen = vec![state.borrow().clone()];
        while *state.borrow() != ConnectionState::Connected {
            state.changed().await.unwrap();
            seen.push(state.borrow().clone());
        }

        assert_eq!(seen.first(), Some(&ConnectionState::Connecting));
        assert!(seen.contains(&ConnectionState::Reconnecting { attempt: 1 }));
        assert_eq!(handle.state(), ConnectionState::Connected);

        handle.stop().await.unwrap();
        assert_eq!(*state.borrow_and_update(), ConnectionState::Stopped);
    }
}
