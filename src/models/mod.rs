//! Domain types shared between the API client, the reconciler and the
//! realtime listener.

mod notification;
mod social;

pub use notification::{NotificationEvent, NotificationKind};
pub use social::{FollowEdge, ReportReason, ReportTarget, TargetKind};

use serde::Deserializer;

/// Helper to deserialize id as either string or integer
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Same as [`deserialize_id`] for optional fields.
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_id")] String);

    let wrapped: Option<Wrapper> = serde::Deserialize::deserialize(deserializer)?;
    Ok(wrapped.map(|Wrapper(id)| id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_id")]
        id: String,
        #[serde(default, deserialize_with = "deserialize_opt_id")]
        other: Option<String>,
    }

    #[test]
    fn test_id_accepts_string_and_integer() {
        let h: Holder = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(h.id, "abc");
        assert!(h.other.is_none());

        let h: Holder = serde_json::from_str(r#"{"id": 42, "other": 7}"#).unwrap();
        assert_eq!(h.id, "42");
        assert_eq!(h.other.as_deref(), Some("7"));

        let h: Holder = serde_json::from_str(r#"{"id": 1, "other": null}"#).unwrap();
        assert!(h.other.is_none());
    }
}
