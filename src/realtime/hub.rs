//! Fan-out of notifications to in-process subscribers.
//!
//! Delivery is fire-and-forget and at most once: publishing never waits
//! on subscribers, and a subscriber that falls too far behind skips the
//! notifications it missed.

use futures::Stream;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::NotificationEvent;

/// Default number of notifications buffered per subscriber.
pub const DEFAULT_HUB_CAPACITY: usize = 64;

/// Broadcasts notifications to every current subscriber.
///
/// Cloning is cheap; clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<NotificationEvent>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HUB_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Start receiving notifications published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver `event` to current subscribers. Returns how many there were.
    pub fn publish(&self, event: NotificationEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                debug!(id = %event.id, "No subscribers, notification dropped");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<NotificationEvent>,
}

impl Subscription {
    /// Wait for the next notification.
    ///
    /// Returns `None` once every hub handle is gone.
    pub async fn recv(&mut self) -> Option<NotificationEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification subscriber lagged, skipping missed events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next notification if one is already waiting.
    pub fn try_recv(&mut self) -> Option<NotificationEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification subscriber lagged, skipping missed events");
                }
                Err(_) => return None,
            }
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {}

    /// Consume the subscription as a stream.
    pub fn into_stream(self) -> impl Stream<Item = NotificationEvent> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let event = sub.recv().await?;
            Some((event, sub))
        })
    }
}
