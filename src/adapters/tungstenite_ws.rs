//! Tungstenite-based WebSocket adapter.
//!
//! This module provides the production [`RealtimeTransport`]: one
//! tokio-tungstenite connection per `connect` call, yielding text frames.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::error::StreamError;
use crate::traits::{FrameStream, Headers, RealtimeTransport};

/// WebSocket transport using tokio-tungstenite.
///
/// Pings are answered by tungstenite while the stream is read. Binary
/// frames are ignored.
///
/// # Example
///
/// ```ignore
/// use tether::adapters::TungsteniteTransport;
/// use tether::traits::{Headers, RealtimeTransport};
///
/// let transport = TungsteniteTransport::new();
/// let mut frames = transport.connect("wss://push.example.com/ws", &Headers::new()).await?;
/// while let Some(frame) = frames.next().await {
///     println!("{:?}", frame);
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RealtimeTransport for TungsteniteTransport {
    async fn connect(&self, url: &str, headers: &Headers) -> Result<FrameStream, StreamError> {
        let connect_failed = |message: String| StreamError::ConnectFailed {
            url: url.to_string(),
            message,
        };

        let mut request = url
            .into_client_request()
            .map_err(|e| connect_failed(e.to_string()))?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| connect_failed(format!("Invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| connect_failed(format!("Invalid header value: {}", e)))?;
            request.headers_mut().insert(name, value);
        }

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| connect_failed(e.to_string()))?;
        info!("Connected to WebSocket server at {}", url);

        let frames = ws_stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!("Received close frame from server");
                    Some(Err(StreamError::ServerClosed {
                        reason: frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty()),
                    }))
                }
                // Ping, Pong, Binary and raw frames carry no notifications
                Ok(_) => None,
                Err(e) => Some(Err(StreamError::ConnectionLost {
                    message: e.to_string(),
                })),
            }
        });

        Ok(Box::pin(frames))
    }
}
