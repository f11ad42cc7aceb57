//! Command handlers for the tether CLI.
//!
//! Each handler runs one command against a [`Session`] and prints the
//! result for a person at a terminal.

use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::error::{ActionOrigin, Feedback, TetherError};
use crate::models::{FollowEdge, ReportReason, ReportTarget, TargetKind};
use crate::monitor::SessionEvent;
use crate::optimistic::{ActionOutcome, FollowView, ReportIntent};
use crate::session::Session;

/// Turn an error from a direct user action into a report for the terminal.
fn surface(err: TetherError) -> color_eyre::Report {
    match Feedback::for_error(&err, ActionOrigin::Direct) {
        Feedback::Login => eyre!("You are not signed in. Run `tether login <email>` first."),
        Feedback::Toast(message) => eyre!(message),
        Feedback::Silent => eyre!(err.user_message()),
    }
}

fn outcome_error(outcome: ActionOutcome, what: &str) -> Result<()> {
    match outcome {
        ActionOutcome::RolledBack(Feedback::Login) => {
            bail!("Your session has expired. Run `tether login <email>` to sign in again.")
        }
        ActionOutcome::RolledBack(_) => bail!("Could not {}; nothing was changed.", what),
        ActionOutcome::Committed => Ok(()),
        // The server never saw the action, so success cannot be claimed
        ActionOutcome::Unchanged | ActionOutcome::Queued => {
            bail!("Could not {}; the request was not sent.", what)
        }
    }
}

pub async fn login(session: &Session, email: &str, password: &str) -> Result<()> {
    let credential = session.login(email, password).await.map_err(surface)?;
    match credential.user_id {
        Some(user_id) => println!("Signed in as {} ({}).", email, user_id),
        None => println!("Signed in as {}.", email),
    }
    Ok(())
}

pub async fn logout(session: &Session) -> Result<()> {
    session.logout().await.map_err(surface)?;
    println!("Signed out.");
    Ok(())
}

pub async fn change_password(session: &Session, current: &str, new: &str) -> Result<()> {
    session
        .api()
        .change_password(current, new)
        .await
        .map_err(surface)?;
    println!("Password changed.");
    Ok(())
}

async fn edge_to(session: &Session, kind: TargetKind, id: &str) -> Result<FollowEdge> {
    let me = session
        .credentials()
        .load_credential()
        .await
        .map_err(|e| surface(e.into()))?
        .ok_or_else(|| eyre!("You are not signed in. Run `tether login <email>` first."))?
        .user_id
        .unwrap_or_else(|| "me".to_string());
    Ok(match kind {
        TargetKind::User => FollowEdge::user(me, id),
        TargetKind::Team => FollowEdge::team(me, id),
    })
}

pub async fn follow(session: &Session, kind: TargetKind, id: &str) -> Result<()> {
    let edge = edge_to(session, kind, id).await?;
    // A one-shot process has no cached view; start from the opposite state
    // so the request is always sent
    session.follows().seed(edge.clone(), FollowView::new(false, 0));
    let outcome = session.follows().follow(edge.clone()).await;
    debug!(edge = %edge, outcome = ?outcome, "Follow finished");
    outcome_error(outcome, &format!("follow {} {}", kind, id))?;
    println!("Following {} {}.", kind, id);
    Ok(())
}

pub async fn unfollow(session: &Session, kind: TargetKind, id: &str) -> Result<()> {
    let edge = edge_to(session, kind, id).await?;
    session.follows().seed(edge.clone(), FollowView::new(true, 0));
    let outcome = session.follows().unfollow(edge.clone()).await;
    debug!(edge = %edge, outcome = ?outcome, "Unfollow finished");
    outcome_error(outcome, &format!("unfollow {} {}", kind, id))?;
    println!("No longer following {} {}.", kind, id);
    Ok(())
}

pub async fn report(
    session: &Session,
    target: ReportTarget,
    reason: ReportReason,
    details: Option<String>,
) -> Result<()> {
    let mut intent = ReportIntent::new(reason);
    if let Some(details) = details {
        intent = intent.with_details(details);
    }
    let outcome = session.reports().report(target.clone(), intent).await;
    outcome_error(outcome, &format!("report {}", target))?;
    println!("Reported {}. Thanks for letting us know.", target);
    Ok(())
}

/// Print notifications until Ctrl-C.
pub async fn watch(session: &Session) -> Result<()> {
    let mut notifications = session.subscribe();
    let mut events = session.monitor().subscribe();
    session.start();
    println!("Watching for notifications. Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notification = notifications.recv() => match notification {
                Some(event) => println!("{}", event),
                None => break,
            },
            event = events.recv() => match event {
                Ok(SessionEvent::LoginRequired) => {
                    eprintln!("Session ended. Run `tether login <email>` in another terminal to resume.");
                }
                Ok(SessionEvent::Refreshed { expires_at }) => {
                    debug!(expires_at = %expires_at, "Session refreshed");
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemorySecureStore, MockHttpClient, MockResponse};
    use crate::auth::{Credential, CredentialStore};
    use crate::config::ClientConfig;
    use crate::error::AuthError;
    use crate::traits::Response;
    use bytes::Bytes;
    use chrono::Utc;
    use std::sync::Arc;

    async fn session(http: &MockHttpClient, signed_in: bool) -> Session {
        let store = Arc::new(InMemorySecureStore::new());
        if signed_in {
            CredentialStore::new(store.clone())
                .save_credential(
                    &Credential::new("tok", Utc::now() + chrono::Duration::hours(1))
                        .with_user_id("u1"),
                )
                .await
                .unwrap();
        }
        let config = ClientConfig::new("https://api.example.com").unwrap();
        Session::from_parts(config, store, Arc::new(http.clone()), None)
    }

    #[test]
    fn test_surface_reauth_points_to_login() {
        let report = surface(AuthError::NotAuthenticated.into());
        assert!(report.to_string().contains("tether login"));
    }

    #[test]
    fn test_surface_validation_uses_user_message() {
        let report = surface(
            AuthError::InvalidCredentials {
                message: String::new(),
            }
            .into(),
        );
        assert_eq!(report.to_string(), "Incorrect email or password.");
    }

    #[tokio::test]
    async fn test_follow_requires_session() {
        let http = MockHttpClient::new();
        let session = session(&http, false).await;
        assert!(follow(&session, TargetKind::User, "42").await.is_err());
        assert!(http.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_follow_failure_reports_no_change() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::Success(Response::new(500, Bytes::new())));
        let session = session(&http, true).await;

        let err = follow(&session, TargetKind::Team, "t-1").await.unwrap_err();
        assert!(err.to_string().contains("nothing was changed"));
        assert_eq!(
            http.get_requests()[0].url,
            "https://api.example.com/teams/t-1/follow"
        );
    }

    #[tokio::test]
    async fn test_unfollow_sends_delete() {
        let http = MockHttpClient::new();
        http.set_method_response(
            "DELETE",
            "https://api.example.com/users/42/follow",
            MockResponse::Success(Response::new(204, Bytes::new())),
        );
        let session = session(&http, true).await;

        unfollow(&session, TargetKind::User, "42").await.unwrap();

        let deletes = http.requests_with_method("DELETE");
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].url, "https://api.example.com/users/42/follow");
        assert_eq!(deletes[0].headers.get("Authorization").unwrap(), "Bearer tok");
    }

    #[tokio::test]
    async fn test_unfollow_rejected_is_an_error() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::Success(Response::new(500, Bytes::new())));
        let session = session(&http, true).await;

        let err = unfollow(&session, TargetKind::Team, "t-1").await.unwrap_err();
        assert!(err.to_string().contains("nothing was changed"));
        assert_eq!(http.requests_with_method("DELETE").len(), 1);
    }

    #[tokio::test]
    async fn test_follow_sends_post() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::Success(Response::new(200, Bytes::new())));
        let session = session(&http, true).await;

        follow(&session, TargetKind::User, "42").await.unwrap();
        assert_eq!(http.requests_with_method("POST").len(), 1);
    }

    #[test]
    fn test_unsent_outcomes_are_errors() {
        assert!(outcome_error(ActionOutcome::Committed, "follow user 1").is_ok());
        let err = outcome_error(ActionOutcome::Unchanged, "unfollow user 1").unwrap_err();
        assert!(err.to_string().contains("not sent"));
        assert!(outcome_error(ActionOutcome::Queued, "follow user 1").is_err());
    }

    #[tokio::test]
    async fn test_report_success() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::Success(Response::new(201, Bytes::new())));
        let session = session(&http, true).await;

        report(
            &session,
            ReportTarget::Post("p-1".to_string()),
            ReportReason::Spam,
            Some("ads".to_string()),
        )
        .await
        .unwrap();

        let body = http.get_requests()[0].json_body().unwrap();
        assert_eq!(body["target_type"], "post");
        assert_eq!(body["details"], "ads");
    }
}
