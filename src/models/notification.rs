//! Push notification payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{deserialize_id, deserialize_opt_id};

/// What a notification is about.
///
/// Unknown kinds are kept verbatim so new server-side kinds still reach
/// subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    Mention,
    TeamInvite,
    Other(String),
}

impl From<String> for NotificationKind {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "follow" | "new_follower" => NotificationKind::Follow,
            "like" => NotificationKind::Like,
            "comment" | "reply" => NotificationKind::Comment,
            "mention" => NotificationKind::Mention,
            "team_invite" | "teaminvite" => NotificationKind::TeamInvite,
            _ => NotificationKind::Other(s),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Follow => write!(f, "follow"),
            NotificationKind::Like => write!(f, "like"),
            NotificationKind::Comment => write!(f, "comment"),
            NotificationKind::Mention => write!(f, "mention"),
            NotificationKind::TeamInvite => write!(f, "team_invite"),
            NotificationKind::Other(s) => write!(f, "{}", s),
        }
    }
}

impl Default for NotificationKind {
    fn default() -> Self {
        NotificationKind::Other("unknown".to_string())
    }
}

/// A notification delivered over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "notification_type", alias = "notificationType")]
    pub kind: NotificationKind,
    /// User the notification is for. Absent on channels that are already
    /// scoped to one user.
    #[serde(
        default,
        alias = "recipientId",
        alias = "user_id",
        alias = "userId",
        deserialize_with = "deserialize_opt_id"
    )]
    pub recipient_id: Option<String>,
    #[serde(
        default,
        alias = "actorId",
        alias = "sender_id",
        alias = "senderId",
        deserialize_with = "deserialize_opt_id"
    )]
    pub actor_id: Option<String>,
    #[serde(default, alias = "body", alias = "text")]
    pub message: Option<String>,
    #[serde(default, alias = "targetId", deserialize_with = "deserialize_opt_id")]
    pub target_id: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NotificationEvent {
    /// Whether this notification should be shown to `user_id`.
    pub fn is_for(&self, user_id: Option<&str>) -> bool {
        match (self.recipient_id.as_deref(), user_id) {
            (Some(recipient), Some(me)) => recipient == me,
            _ => true,
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind)?;
        match (&self.actor_id, &self.message) {
            (_, Some(message)) => write!(f, "{}", message),
            (Some(actor), None) => write!(f, "from {}", actor),
            (None, None) => write!(f, "notification {}", self.id),
        }
    }
}
