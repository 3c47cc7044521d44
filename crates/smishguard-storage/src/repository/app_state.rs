//! Key/value app state repository.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Repository for the `app_state` table.
pub struct AppStateRepo;

impl AppStateRepo {
    /// Get a value by key.
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    /// Set a value (insert or replace).
    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    /// Set several values in one transaction; either all are written or none.
    pub fn set_many(conn: &mut Connection, entries: &[(&str, &str)]) -> Result<()> {
        let tx = conn.transaction()?;
        for (key, value) in entries {
            Self::set(&tx, key, value)?;
        }
        tx.commit()?;

        Ok(())
    }

    /// Delete a value. Returns true if a row was removed.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM app_state WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }
}
