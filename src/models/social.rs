//! Follow graph and moderation types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of identity a follow edge points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    User,
    Team,
}

impl TargetKind {
    /// Collection segment used in REST paths.
    pub fn path_segment(&self) -> &'static str {
        match self {
            TargetKind::User => "users",
            TargetKind::Team => "teams",
        }
    }

    /// Parse the CLI/user-facing spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "users" => Some(TargetKind::User),
            "team" | "teams" => Some(TargetKind::Team),
            _ => None,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::User => write!(f, "user"),
            TargetKind::Team => write!(f, "team"),
        }
    }
}

/// A directed edge in the follow graph.
///
/// The client never owns edges; it holds a cached view of what the server
/// last confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: String,
    pub following_id: String,
    pub following_type: TargetKind,
}

impl FollowEdge {
    /// Edge from `follower_id` to a user.
    pub fn user(follower_id: impl Into<String>, following_id: impl Into<String>) -> Self {
        Self {
            follower_id: follower_id.into(),
            following_id: following_id.into(),
            following_type: TargetKind::User,
        }
    }

    /// Edge from `follower_id` to a team.
    pub fn team(follower_id: impl Into<String>, following_id: impl Into<String>) -> Self {
        Self {
            follower_id: follower_id.into(),
            following_id: following_id.into(),
            following_type: TargetKind::Team,
        }
    }
}

impl fmt::Display for FollowEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}:{}",
            self.follower_id, self.following_type, self.following_id
        )
    }
}

/// Something a user can report for moderation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target_type", content = "target_id", rename_all = "lowercase")]
pub enum ReportTarget {
    Post(String),
    Comment(String),
    User(String),
}

impl ReportTarget {
    /// Parse `kind` + `id` from user input.
    pub fn parse(kind: &str, id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        match kind.to_ascii_lowercase().as_str() {
            "post" => Some(ReportTarget::Post(id)),
            "comment" => Some(ReportTarget::Comment(id)),
            "user" => Some(ReportTarget::User(id)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportTarget::Post(_) => "post",
            ReportTarget::Comment(_) => "comment",
            ReportTarget::User(_) => "user",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ReportTarget::Post(id) | ReportTarget::Comment(id) | ReportTarget::User(id) => id,
        }
    }
}

impl fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Why something was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    HateSpeech,
    Violence,
    Nudity,
    FalseInformation,
    Other(String),
}

impl ReportReason {
    /// Parse a reason keyword; anything unrecognized becomes `Other`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "spam" => ReportReason::Spam,
            "harassment" => ReportReason::Harassment,
            "hate_speech" => ReportReason::HateSpeech,
            "violence" => ReportReason::Violence,
            "nudity" => ReportReason::Nudity,
            "false_information" => ReportReason::FalseInformation,
            _ => ReportReason::Other(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_kind_paths() {
        assert_eq!(TargetKind::User.path_segment(), "users");
        assert_eq!(TargetKind::Team.path_segment(), "teams");
        assert_eq!(TargetKind::parse("Team"), Some(TargetKind::Team));
        assert_eq!(TargetKind::parse("group"), None);
    }

    #[test]
    fn test_follow_edge_display_is_stable_key() {
        let edge = FollowEdge::user("me", "42");
        assert_eq!(edge.to_string(), "me->user:42");
        assert_eq!(FollowEdge::team("me", "7").to_string(), "me->team:7");
    }

    #[test]
    fn test_follow_edge_serde_shape() {
        let edge = FollowEdge::team("u1", "t9");
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["following_type"], "team");
        assert_eq!(json["following_id"], "t9");
    }

    #[test]
    fn test_report_target_serde_shape() {
        let target = ReportTarget::Comment("c-1".to_string());
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["target_type"], "comment");
        assert_eq!(json["target_id"], "c-1");
        assert_eq!(target.to_string(), "comment:c-1");
    }

    #[test]
    fn test_report_parsing() {
        assert_eq!(
            ReportTarget::parse("POST", "9"),
            Some(ReportTarget::Post("9".to_string()))
        );
        assert_eq!(ReportTarget::parse("team", "9"), None);
        assert_eq!(ReportReason::parse("hate-speech"), ReportReason::HateSpeech);
        assert_eq!(
            ReportReason::parse("off topic"),
            ReportReason::Other("off topic".to_string())
        );
    }
}
