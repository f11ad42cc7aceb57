//! Scripted realtime transport for testing the listener.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

use crate::error::StreamError;
use crate::traits::{FrameStream, Headers, RealtimeTransport};

/// One recorded `connect` call.
#[derive(Debug, Clone)]
pub struct RecordedConnect {
    pub url: String,
    pub headers: Headers,
}

enum Scripted {
    Fail(String),
    Frames(Vec<Result<String, StreamError>>),
    Live(mpsc::UnboundedReceiver<Result<String, StreamError>>),
}

#[derive(Default)]
struct State {
    connections: VecDeque<Scripted>,
    connects: Vec<RecordedConnect>,
}

/// [`RealtimeTransport`] that hands out scripted connections in order.
///
/// Once the script runs out every connect fails, which keeps a listener
/// in its backoff loop.
///
/// # Example
///
/// ```ignore
/// let transport = MockTransport::new();
/// transport.push_frames(vec![Ok(r#"{"type":"ping"}"#.to_string())]);
/// let live = transport.push_live();
/// live.send(Ok(r#"{"id":"n1"}"#.to_string())).unwrap();
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
    connected: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Next connect fails with [`StreamError::ConnectFailed`].
    pub fn push_failure(&self, message: &str) {
        self.state()
            .connections
            .push_back(Scripted::Fail(message.to_string()));
    }

    /// Next connect yields `frames` and then ends.
    pub fn push_frames(&self, frames: Vec<Result<String, StreamError>>) {
        self.state().connections.push_back(Scripted::Frames(frames));
    }

    /// Next connect stays open, yielding whatever is sent on the returned
    /// sender. Dropping the sender ends the connection.
    pub fn push_live(&self) -> mpsc::UnboundedSender<Result<String, StreamError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().connections.push_back(Scripted::Live(rx));
        tx
    }

    pub fn connects(&self) -> Vec<RecordedConnect> {
        self.state().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state().connects.len()
    }

    /// Wait until at least `n` connects have been attempted.
    pub async fn wait_for_connects(&self, n: usize) {
        loop {
            let notified = self.connected.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.connect_count() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl RealtimeTransport for MockTransport {
    async fn connect(&self, url: &str, headers: &Headers) -> Result<FrameStream, StreamError> {
        let next = {
            let mut state = self.state();
            state.connects.push(RecordedConnect {
                url: url.to_string(),
                headers: headers.clone(),
            });
            state.connections.pop_front()
        };
        self.connected.notify_waiters();

        match next {
            Some(Scripted::Frames(frames)) => Ok(futures::stream::iter(frames).boxed()),
            Some(Scripted::Live(rx)) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|frame| (frame, rx))
            })
            .boxed()),
            Some(Scripted::Fail(message)) => Err(StreamError::ConnectFailed {
                url: url.to_string(),
                message,
            }),
            None => Err(StreamError::ConnectFailed {
                url: url.to_string(),
                message: "no scripted connection".to_string(),
            }),
        }
    }
}
