//! Store rows to wire models.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use huddle_db::models::{GroupRow, MessageRow, UserRow};
use huddle_types::models::{Group, Message, User};

/// SQLite keeps timestamps as `YYYY-MM-DD HH:MM:SS[.fff]` without a zone;
/// they are always UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

fn timestamp_or_default(raw: &str, what: &str, id: i64) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on {} {}", raw, what, id);
        DateTime::default()
    })
}

pub fn user(row: UserRow) -> User {
    User {
        created_at: timestamp_or_default(&row.created_at, "user", row.id),
        id: row.id,
        username: row.username,
        email: row.email,
    }
}

pub fn group(row: GroupRow) -> Group {
    Group {
        created_at: timestamp_or_default(&row.created_at, "group", row.id),
        id: row.id,
        name: row.name,
        description: row.description,
    }
}

/// Legacy rows without a stored author name render as "unknown".
pub fn message(row: MessageRow) -> Message {
    Message {
        timestamp: timestamp_or_default(&row.timestamp, "message", row.id),
        id: row.id,
        group_id: row.group_id,
        user_id: row.user_id,
        username: row.username.unwrap_or_else(|| "unknown".to_string()),
        message: row.message,
    }
}
