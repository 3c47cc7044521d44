//! SmishGuard Storage - SQLite persistence layer.
//!
//! This crate owns every durable record of the monitoring pipeline:
//!
//! - Monitoring flags (user preference, cached listener permission)
//! - Scan history (newest first, capped at 50 records)
//! - Lifetime scan statistics
//!
//! All of it lives in one key/value `app_state` table. Structured entries are
//! JSON-encoded.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use smishguard_core::AnalysisResult;
//! use smishguard_storage::{Database, PersistedFlagStore, ScanLedger};
//!
//! let db = Arc::new(Database::in_memory().unwrap());
//!
//! let flags = PersistedFlagStore::new(db.clone());
//! flags.set_monitoring_enabled(true).unwrap();
//!
//! let ledger = ScanLedger::open(db);
//! ledger.record(
//!     "Your parcel is held, pay the fee at http://bit.ly/x",
//!     AnalysisResult {
//!         is_phishing: true,
//!         key_indicators: vec!["shortened-link".into()],
//!         analysis_details: "Fee request with an obfuscated link".into(),
//!         security_recommendation: "Delete the message".into(),
//!     },
//!     "en",
//! );
//! assert_eq!(ledger.stats().threats_found, 1);
//! ```

mod connection;
mod database;
pub mod error;
pub mod flags;
pub mod ledger;
pub mod repository;
mod schema;

pub use connection::SharedConnection;
pub use database::Database;
pub use error::{Result, StorageError};
pub use flags::{PersistedFlagStore, LISTENER_ENABLED_KEY, MONITORING_ENABLED_KEY};
pub use ledger::{LedgerSnapshot, ScanLedger, HISTORY_KEY, STATS_KEY};
pub use repository::AppStateRepo;
