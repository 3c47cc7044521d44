//! Scan ledger: bounded scan history plus lifetime counters.
//!
//! The ledger keeps its whole value (history + stats) in memory behind one
//! mutex. Every mutation is a read-modify-write of that value under the lock,
//! followed by a write of both durable entries in a single transaction, so
//! concurrent analysis completions cannot lose each other's updates.
//!
//! History is newest-first by completion, capped at [`HISTORY_CAPACITY`].
//! [`ScanLedger::clear`] empties the history but keeps the stats: they count
//! every scan ever made, not just the visible ones.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, warn};

use smishguard_core::{AnalysisResult, AppStats, ScanRecord, HISTORY_CAPACITY};

use crate::error::Result;
use crate::Database;

/// Key for the JSON-encoded scan history.
pub const HISTORY_KEY: &str = "@phishing_checker_history";

/// Key for the JSON-encoded stats.
pub const STATS_KEY: &str = "@phishing_checker_stats";

/// Point-in-time view of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Newest first.
    pub history: Vec<ScanRecord>,
    pub stats: AppStats,
}

/// Persisted, capped scan history with aggregate stats.
pub struct ScanLedger {
    db: Arc<Database>,
    state: Mutex<LedgerSnapshot>,
    updates: watch::Sender<LedgerSnapshot>,
}

impl std::fmt::Debug for ScanLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ScanLedger")
            .field("records", &state.history.len())
            .field("stats", &state.stats)
            .finish()
    }
}

impl ScanLedger {
    /// Opens the ledger and loads it from storage.
    pub fn open(db: Arc<Database>) -> Self {
        let (updates, _) = watch::channel(LedgerSnapshot::default());
        let ledger = Self {
            db,
            state: Mutex::new(LedgerSnapshot::default()),
            updates,
        };
        ledger.load();
        ledger
    }

    /// Reloads history and stats from storage, replacing the in-memory copy.
    ///
    /// Missing or unreadable entries load as empty history / zero stats.
    /// Storage is read under the ledger lock so a concurrent [`record`] is
    /// either fully visible to the reload or applied after it.
    ///
    /// [`record`]: ScanLedger::record
    pub fn load(&self) -> (Vec<ScanRecord>, AppStats) {
        let mut state = self.lock();

        let mut history: Vec<ScanRecord> = self.read_entry(HISTORY_KEY).unwrap_or_default();
        history.truncate(HISTORY_CAPACITY);
        let stats: AppStats = self.read_entry(STATS_KEY).unwrap_or_default();

        *state = LedgerSnapshot {
            history: history.clone(),
            stats,
        };
        self.updates.send_replace(state.clone());

        (history, stats)
    }

    /// Records a completed analysis and returns the new record.
    ///
    /// The record goes to the front of the history; the oldest entries beyond
    /// the cap are dropped. Stats are updated in the same step. A persistence
    /// failure is logged and the in-memory ledger still reflects the record.
    pub fn record(
        &self,
        message: impl Into<String>,
        result: AnalysisResult,
        language: impl Into<String>,
    ) -> ScanRecord {
        let mut state = self.lock();

        let record = ScanRecord::new(message, result, language);
        state.history.insert(0, record.clone());
        state.history.truncate(HISTORY_CAPACITY);
        state.stats = state.stats.with_scan(record.result.is_phishing);

        if let Err(e) = self.persist(&state) {
            error!("Failed to persist scan record {}: {}", record.id, e);
        }
        self.updates.send_replace(state.clone());

        debug!(
            "Recorded scan {} (phishing: {}, total scans: {})",
            record.id, record.result.is_phishing, state.stats.total_scans
        );
        record
    }

    /// Empties the history. Stats are left untouched.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.history.clear();

        if let Err(e) = self.db.delete_state(HISTORY_KEY) {
            error!("Failed to erase persisted scan history: {}", e);
        }
        self.updates.send_replace(state.clone());
    }

    /// Current history, newest first.
    pub fn history(&self) -> Vec<ScanRecord> {
        self.lock().history.clone()
    }

    /// Current stats.
    pub fn stats(&self) -> AppStats {
        self.lock().stats
    }

    /// Subscribes to ledger changes. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<LedgerSnapshot> {
        self.updates.subscribe()
    }

    fn persist(&self, state: &LedgerSnapshot) -> Result<()> {
        let history = serde_json::to_string(&state.history)?;
        let stats = serde_json::to_string(&state.stats)?;
        self.db
            .set_states(&[(HISTORY_KEY, history.as_str()), (STATS_KEY, stats.as_str())])
    }

    fn read_entry<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.db.get_json(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {}, using defaults: {}", key, e);
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
