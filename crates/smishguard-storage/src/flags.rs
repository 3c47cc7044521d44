//! Persisted monitoring flags.
//!
//! Two independent booleans: the user's monitoring preference and the last
//! known state of the OS notification-listener permission. Writes go straight
//! to the database; the next [`PersistedFlagStore::get`] sees them.

use std::sync::Arc;

use tracing::warn;

use smishguard_core::MonitoringFlags;

use crate::error::Result;
use crate::Database;

/// Key for the user's monitoring preference.
pub const MONITORING_ENABLED_KEY: &str = "@phishing_monitoring_enabled";

/// Key for the cached notification-listener permission.
pub const LISTENER_ENABLED_KEY: &str = "@notification_listener_enabled";

/// Durable store for [`MonitoringFlags`].
#[derive(Clone)]
pub struct PersistedFlagStore {
    db: Arc<Database>,
}

impl PersistedFlagStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Reads both flags. Missing or unreadable entries read as `false`.
    pub fn get(&self) -> MonitoringFlags {
        MonitoringFlags {
            monitoring_enabled: self.read_flag(MONITORING_ENABLED_KEY),
            listener_enabled: self.read_flag(LISTENER_ENABLED_KEY),
        }
    }

    pub fn set_monitoring_enabled(&self, enabled: bool) -> Result<()> {
        self.write_flag(MONITORING_ENABLED_KEY, enabled)
    }

    pub fn set_listener_enabled(&self, enabled: bool) -> Result<()> {
        self.write_flag(LISTENER_ENABLED_KEY, enabled)
    }

    fn read_flag(&self, key: &str) -> bool {
        match self.db.get_state(key) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!("Failed to read {}, assuming false: {}", key, e);
                false
            }
        }
    }

    fn write_flag(&self, key: &str, enabled: bool) -> Result<()> {
        self.db
            .set_state(key, if enabled { "true" } else { "false" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Arc<Database>, PersistedFlagStore) {
        let db = Arc::new(Database::in_memory().unwrap());
        (db.clone(), PersistedFlagStore::new(db))
    }

    #[test]
    fn test_defaults_to_disabled() {
        let (_db, flags) = store();
        assert_eq!(flags.get(), MonitoringFlags::default());
    }

    #[test]
    fn test_flags_are_independent() {
        let (_db, flags) = store();

        flags.set_monitoring_enabled(true).unwrap();
        assert_eq!(
            flags.get(),
            MonitoringFlags {
                monitoring_enabled: true,
                listener_enabled: false,
            }
        );

        flags.set_listener_enabled(true).unwrap();
        flags.set_monitoring_enabled(false).unwrap();
        assert_eq!(
            flags.get(),
            MonitoringFlags {
                monitoring_enabled: false,
                listener_enabled: true,
            }
        );
    }

    #[test]
    fn test_stored_as_string_booleans() {
        let (db, flags) = store();
        flags.set_monitoring_enabled(true).unwrap();

        assert_eq!(
            db.get_state(MONITORING_ENABLED_KEY).unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_unreadable_storage_reads_false() {
        let (db, flags) = store();
        flags.set_monitoring_enabled(true).unwrap();
        db.execute_batch("DROP TABLE app_state").unwrap();

        assert_eq!(flags.get(), MonitoringFlags::default());
        assert!(flags.set_monitoring_enabled(true).is_err());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.db");

        let flags = PersistedFlagStore::new(Arc::new(Database::with_path(&path).unwrap()));
        flags.set_monitoring_enabled(true).unwrap();
        drop(flags);

        let reopened = PersistedFlagStore::new(Arc::new(Database::with_path(&path).unwrap()));
        assert!(reopened.get().monitoring_enabled);
    }
}
