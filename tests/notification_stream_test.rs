//! Realtime notifications over SSE from a mock backend.

mod common;

use std::time::Duration;

use common::*;
use tether::models::{NotificationEvent, NotificationKind};
use tether::realtime::{ConnectionState, Subscription};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_BODY: &str = "\
event: connected\n\
data: {\"user_id\": \"user-123\"}\n\
\n\
event: notification\n\
data: {\"id\": \"n1\", \"kind\": \"follow\", \"recipient_id\": \"user-123\", \"actor_id\": \"user-x\"}\n\
\n\
event: notification\n\
data: {\"id\": \"n2\", \"kind\": \"like\", \"recipient_id\": \"someone-else\"}\n\
\n\
: keepalive comment\n\
event: ping\n\
\n\
data: {\"type\": \"notification\", \"notification\": {\"id\": 3, \"notificationType\": \"comment\", \"recipientId\": \"user-123\", \"body\": \"nice run\"}}\n\
\n";

async fn next(subscription: &mut Subscription) -> NotificationEvent {
    tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("notification within 5s")
        .expect("hub open")
}

#[tokio::test]
async fn test_sse_notifications_reach_subscribers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/stream"))
        .and(header("authorization", format!("Bearer {}", TEST_ACCESS_TOKEN).as_str()))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(STREAM_BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let (session, _store) = session_for(&server, signed_in_credential()).await;
    let mut notifications = session.subscribe();
    session.start();

    let first = next(&mut notifications).await;
    assert_eq!(first.id, "n1");
    assert_eq!(first.kind, NotificationKind::Follow);
    assert_eq!(first.actor_id.as_deref(), Some("user-x"));

    // n2 belongs to another user and is never delivered
    let second = next(&mut notifications).await;
    assert_eq!(second.id, "3");
    assert_eq!(second.kind, NotificationKind::Comment);
    assert_eq!(second.message.as_deref(), Some("nice run"));

    session.shutdown().await;
    assert!(session.connection_state().is_none());
}

#[tokio::test]
async fn test_unsubscribed_receiver_does_not_block_others() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(STREAM_BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let (session, _store) = session_for(&server, signed_in_credential()).await;
    let dropped = session.subscribe();
    let mut kept = session.subscribe();
    dropped.unsubscribe();
    session.start();

    assert_eq!(next(&mut kept).await.id, "n1");
    assert_eq!(session.hub().subscriber_count(), 1);

    session.shutdown().await;
}

#[tokio::test]
async fn test_rejected_stream_keeps_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/stream"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (session, _store) = session_for(&server, signed_in_credential()).await;
    session.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(ConnectionState::Reconnecting { attempt }) = session.connection_state() {
                assert!(attempt >= 1);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("listener backs off after a rejected connect");

    session.shutdown().await;
}
