use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Historical messages a fresh deployment starts with. Their authors predate
/// accounts, so they carry a display name but no user reference.
const SEED_MESSAGES: &[(i64, &str, &str, &str)] = &[
    (1, "Anonymous", "Someone order Bornvita!!", "2020-08-20 11:35:00"),
    (2, "Anonymous", "hahahahah!!", "2020-08-20 11:38:00"),
    (3, "Anonymous", "I'm Excited For this Event! Ho-Ho", "2020-08-20 11:56:00"),
    (4, "Anonymous", "Hello!", "2020-08-20 12:35:00"),
    (5, "Anonymous", "Yessss!!!!!", "2020-08-20 12:42:00"),
    (6, "Kirtidan Gadhvi", "We have Surprise For you!!", "2020-08-20 13:35:00"),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE IF NOT EXISTS groups (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                description TEXT,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE IF NOT EXISTS messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id    INTEGER NOT NULL REFERENCES groups(id),
                user_id     INTEGER REFERENCES users(id),
                username    TEXT,
                message     TEXT NOT NULL,
                timestamp   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_messages_group
                ON messages(group_id, timestamp, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    seed(conn)?;

    info!("Database migrations complete");
    Ok(())
}

/// One-time bootstrap of the default group and its history. Fixed ids make
/// it a no-op on every later start.
fn seed(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO groups (id, name, description) VALUES (1, ?1, ?2)",
        ("Fun Friday Group", "A group for fun discussions"),
    )?;

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO messages (id, group_id, user_id, username, message, timestamp)
         VALUES (?1, 1, NULL, ?2, ?3, ?4)",
    )?;
    for (id, username, message, timestamp) in SEED_MESSAGES {
        stmt.execute((id, username, message, timestamp))?;
    }

    Ok(())
}
