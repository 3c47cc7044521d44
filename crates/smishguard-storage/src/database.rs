//! Typed access to the `app_state` key/value table.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::connection::SharedConnection;
use crate::error::{Result, StorageError};
use crate::repository::AppStateRepo;

/// SmishGuard's durable state. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: SharedConnection,
}

impl Database {
    /// Opens the database file at `path`, creating missing directories.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at {:?}", path);
        let conn = SharedConnection::open(&path)?;

        Ok(Self { conn })
    }

    /// Opens a throwaway in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = SharedConnection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// `<data dir>/smishguard.db`.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "smishguard", "smishguard")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("smishguard.db"))
    }

    /// Get a raw app state value.
    pub fn get_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        AppStateRepo::get(&conn, key)
    }

    /// Set a raw app state value.
    pub fn set_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        AppStateRepo::set(&conn, key, value)
    }

    /// Set several raw values atomically.
    pub fn set_states(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.conn.lock();
        AppStateRepo::set_many(&mut conn, entries)
    }

    /// Delete an app state value. Returns true if it existed.
    pub fn delete_state(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        AppStateRepo::delete(&conn, key)
    }

    /// Get a JSON-encoded app state value.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_state(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Run raw SQL against the connection (test fault injection).
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_state_roundtrip() {
        let db = Database::in_memory().unwrap();

        db.set_state("key", "value").unwrap();
        assert_eq!(db.get_state("key").unwrap().as_deref(), Some("value"));

        assert!(db.delete_state("key").unwrap());
        assert!(db.get_state("key").unwrap().is_none());
    }

    #[test]
    fn test_json_values() {
        let db = Database::in_memory().unwrap();

        db.set_state("list", "[1,2,3]").unwrap();
        let list: Vec<i32> = db.get_json("list").unwrap().unwrap();
        assert_eq!(list, vec![1, 2, 3]);

        let missing: Option<Vec<i32>> = db.get_json("missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_corrupt_json_is_an_error() {
        let db = Database::in_memory().unwrap();
        db.set_state("list", "not json").unwrap();

        assert!(db.get_json::<Vec<i32>>("list").is_err());
    }

    #[test]
    fn test_file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("smishguard.db");

        Database::with_path(&path)
            .unwrap()
            .set_state("key", "durable")
            .unwrap();

        let reopened = Database::with_path(&path).unwrap();
        assert_eq!(reopened.get_state("key").unwrap().as_deref(), Some("durable"));
    }
}
