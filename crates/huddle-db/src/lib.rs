pub mod migrations;
pub mod models;
pub mod queries;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, ErrorCode};
use tracing::{info, warn};

/// How long SQLite itself waits on a file lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// The relational store. One connection guarded by a mutex gives the
/// single-writer discipline the message and user tables rely on.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let db = Self::prepare(conn)?;
        info!("Database ready at {}", path.display());
        Ok(db)
    }

    /// Fresh private database with the same schema and seed.
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn).context("running migrations")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive use of the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&self.lock())
    }

    /// A closure that panicked mid-call leaves SQLite consistent (any open
    /// transaction rolls back on drop), so a poisoned lock is taken over
    /// rather than failing every later request.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("Store connection lock was poisoned; recovering");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }
}

/// True when `err` is a UNIQUE constraint violation, e.g. a second account
/// racing past the duplicate check with the same email.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _)) => {
            e.code == ErrorCode::ConstraintViolation && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
