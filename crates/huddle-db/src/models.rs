//! Database row types. These map directly to SQLite rows and stay distinct
//! from the huddle-types API models to keep the DB layer independent.
//! Timestamps are kept as stored: `YYYY-MM-DD HH:MM:SS[.fff]`, UTC.

#[derive(Debug)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub group_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub message: String,
    pub timestamp: String,
}
