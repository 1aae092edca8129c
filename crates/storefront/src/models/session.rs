//! Guest session record types.
//!
//! The record is an open JSON object so callers can stash arbitrary metadata
//! (landing page, referrer, and so on) next to the fields this crate manages.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Stored body of `session:<session>`.
pub type SessionData = Map<String, Value>;

/// Well-known fields in a session record.
pub mod keys {
    /// RFC 3339 timestamp of the last request seen for the session.
    pub const LAST_ACTIVITY: &str = "lastActivity";

    /// RFC 3339 timestamp of session creation.
    pub const CREATED_AT: &str = "createdAt";
}

/// Build the initial record for a freshly generated session.
#[must_use]
pub fn new_session_data(now: DateTime<Utc>) -> SessionData {
    let stamp = Value::String(now.to_rfc3339());
    let mut data = SessionData::new();
    data.insert(keys::CREATED_AT.to_owned(), stamp.clone());
    data.insert(keys::LAST_ACTIVITY.to_owned(), stamp);
    data
}

/// Read `lastActivity` back out of a record, if present and well-formed.
#[must_use]
pub fn last_activity(data: &SessionData) -> Option<DateTime<Utc>> {
    data.get(keys::LAST_ACTIVITY)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_data_has_timestamps() {
        let now = Utc::now();
        let data = new_session_data(now);
        assert!(data.contains_key(keys::CREATED_AT));
        assert_eq!(
            last_activity(&data).map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );
    }

    #[test]
    fn test_last_activity_ignores_garbage() {
        let mut data = SessionData::new();
        assert!(last_activity(&data).is_none());
        data.insert(keys::LAST_ACTIVITY.to_owned(), Value::from(42));
        assert!(last_activity(&data).is_none());
        data.insert(keys::LAST_ACTIVITY.to_owned(), Value::from("yesterday"));
        assert!(last_activity(&data).is_none());
    }
}
