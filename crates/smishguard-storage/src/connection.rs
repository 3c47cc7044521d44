//! The shared SQLite connection.
//!
//! Every flag and ledger write is one short statement or transaction, so a
//! single connection behind a mutex serves all callers.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use crate::error::Result;
use crate::schema;

/// Pragmas applied to every connection. WAL keeps readers off the writer's
/// lock; `synchronous = FULL` makes a flag write durable once it returns.
const CONNECTION_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = FULL;
    PRAGMA busy_timeout = 5000;
";

/// Cloneable handle to one migrated connection.
#[derive(Clone)]
pub struct SharedConnection {
    conn: Arc<Mutex<Connection>>,
}

impl SharedConnection {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::prepare(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(mut conn: Connection) -> Result<Self> {
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        schema::migrate(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locks the connection. A panic in another holder does not make the
    /// connection unusable; SQLite rolls back any open transaction.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_connection_is_migrated() {
        let shared = SharedConnection::open_in_memory().unwrap();

        let count: i64 = shared
            .lock()
            .query_row("SELECT COUNT(*) FROM app_state", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_clones_share_one_database() {
        let a = SharedConnection::open_in_memory().unwrap();
        let b = a.clone();

        a.lock()
            .execute("INSERT INTO app_state (key, value) VALUES ('k', 'v')", [])
            .unwrap();
        let value: String = b
            .lock()
            .query_row("SELECT value FROM app_state WHERE key = 'k'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "v");
    }
}
