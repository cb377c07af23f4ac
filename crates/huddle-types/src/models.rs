use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of an account. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A posted message.
///
/// `username` is the author's name as it was when the message was sent; it is
/// not re-resolved against the users table, so history survives renames.
/// `user_id` is `None` for legacy rows that predate accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub group_id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// History order: send time, then store-assigned id.
    pub fn sort_key(&self) -> (DateTime<Utc>, i64) {
        (self.timestamp, self.id)
    }
}
