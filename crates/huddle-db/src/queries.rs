use crate::Database;
use crate::models::{GroupRow, MessageRow, UserRow};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, username, email, password, created_at";
const GROUP_COLUMNS: &str = "id, name, description, created_at";
const MESSAGE_COLUMNS: &str = "id, group_id, user_id, username, message, timestamp";

impl Database {
    // -- Users --

    /// Insert a user and return the stored row. A duplicate email or username
    /// surfaces as an error that [`crate::is_unique_violation`] recognises.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            let id = conn.last_insert_rowid();
            query_user(conn, "id = ?1", id)?.ok_or_else(|| anyhow!("User {} vanished after insert", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Any existing user holding either the email or the username.
    /// Comparison is exact and case-sensitive.
    pub fn find_user_conflict(&self, email: &str, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 OR username = ?2 LIMIT 1");
            let row = conn.query_row(&sql, (email, username), user_from_row).optional()?;
            Ok(row)
        })
    }

    // -- Groups --

    /// All groups, newest first.
    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GROUP_COLUMNS} FROM groups ORDER BY created_at DESC, id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], group_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_group(&self, id: i64) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1");
            let row = conn.query_row(&sql, [id], group_from_row).optional()?;
            Ok(row)
        })
    }

    // -- Messages --

    /// Append a message. The store assigns the id, and the timestamp too when
    /// `timestamp` is `None`. Returns the persisted row.
    pub fn insert_message(
        &self,
        group_id: i64,
        user_id: Option<i64>,
        username: &str,
        message: &str,
        timestamp: Option<&str>,
    ) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (group_id, user_id, username, message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, COALESCE(?5, strftime('%Y-%m-%d %H:%M:%f', 'now')))",
                rusqlite::params![group_id, user_id, username, message, timestamp],
            )?;
            let id = conn.last_insert_rowid();
            let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
            let row = conn.query_row(&sql, [id], message_from_row)?;
            Ok(row)
        })
    }

    /// Every message in the group, ascending by send time; ties fall back to
    /// insertion order.
    pub fn get_messages(&self, group_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE group_id = ?1
                 ORDER BY timestamp ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([group_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, predicate: &str, value: P) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}");
    let row = conn.query_row(&sql, [value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        message: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn seed_is_idempotent() {
        let db = db();
        db.with_conn(|conn| crate::migrations::run(conn)).unwrap();

        assert_eq!(db.list_groups().unwrap().len(), 1);
        let history = db.get_messages(1).unwrap();
        assert_eq!(history.len(), 6);
        assert_eq!(history[0].message, "Someone order Bornvita!!");
        assert!(history.iter().all(|m| m.user_id.is_none()));
    }

    #[test]
    fn duplicate_email_or_username_is_rejected() {
        let db = db();
        db.create_user("alice", "alice@x.com", "hash").unwrap();

        let err = db.create_user("alice2", "alice@x.com", "hash").err().unwrap();
        assert!(is_unique_violation(&err));
        let err = db.create_user("alice", "other@x.com", "hash").err().unwrap();
        assert!(is_unique_violation(&err));

        assert!(db.find_user_conflict("alice@x.com", "nobody").unwrap().is_some());
        assert!(db.find_user_conflict("nobody@x.com", "alice").unwrap().is_some());
        assert!(db.find_user_conflict("ALICE@x.com", "Alice").unwrap().is_none());
    }

    #[test]
    fn user_lookup_by_email_and_id() {
        let db = db();
        let created = db.create_user("bob", "bob@x.com", "hash").unwrap();

        let by_email = db.get_user_by_email("bob@x.com").unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(db.get_user_by_id(created.id).unwrap().unwrap().username, "bob");
        assert!(db.get_user_by_email("missing@x.com").unwrap().is_none());
        assert!(db.get_user_by_id(9999).unwrap().is_none());
    }

    #[test]
    fn appended_messages_come_back_in_append_order() {
        let db = db();
        db.with_conn(|conn| {
            conn.execute("INSERT INTO groups (id, name) VALUES (7, 'empty')", [])?;
            Ok(())
        })
        .unwrap();
        assert!(db.get_messages(7).unwrap().is_empty());

        let user = db.create_user("carol", "carol@x.com", "hash").unwrap();
        let mut ids = Vec::new();
        for body in ["one", "two", "three", "four"] {
            let row = db.insert_message(7, Some(user.id), "carol", body, None).unwrap();
            assert_eq!(row.message, body);
            assert_eq!(row.username.as_deref(), Some("carol"));
            ids.push(row.id);
        }

        let listed = db.get_messages(7).unwrap();
        let bodies: Vec<&str> = listed.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, ["one", "two", "three", "four"]);
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), ids);
        assert!(listed.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn supplied_timestamp_orders_before_later_ones() {
        let db = db();
        let late = db.insert_message(1, None, "x", "late", Some("2030-01-01 00:00:00")).unwrap();
        let early = db.insert_message(1, None, "x", "early", Some("2019-01-01 00:00:00")).unwrap();
        assert!(early.id > late.id);

        let listed = db.get_messages(1).unwrap();
        assert_eq!(listed.first().unwrap().message, "early");
        assert_eq!(listed.last().unwrap().message, "late");
    }

    #[test]
    fn equal_timestamps_tie_break_on_id() {
        let db = db();
        let ts = Some("2025-05-05 05:05:05");
        let a = db.insert_message(1, None, "x", "a", ts).unwrap();
        let b = db.insert_message(1, None, "x", "b", ts).unwrap();

        let listed = db.get_messages(1).unwrap();
        let tail: Vec<i64> = listed.iter().rev().take(2).map(|m| m.id).collect();
        assert_eq!(tail, [b.id, a.id]);
    }

    #[test]
    fn unknown_group_has_no_metadata() {
        let db = db();
        assert!(db.get_group(999).unwrap().is_none());
        assert_eq!(db.get_group(1).unwrap().unwrap().name, "Fun Friday Group");
    }
}
