//! Analyze-and-record, shared by manual scans and the monitoring pipeline.

use std::sync::Arc;

use tracing::debug;

use smishguard_core::analysis::{AnalysisError, Result};
use smishguard_core::{RemoteAnalysisClient, ScanRecord};
use smishguard_storage::ScanLedger;

/// Sends messages to the classifier and records verdicts in the ledger.
#[derive(Debug, Clone)]
pub struct ScanService {
    client: RemoteAnalysisClient,
    ledger: Arc<ScanLedger>,
}

impl ScanService {
    pub fn new(client: RemoteAnalysisClient, ledger: Arc<ScanLedger>) -> Self {
        Self { client, ledger }
    }

    /// Analyzes a message and records the verdict.
    ///
    /// On failure nothing is recorded and the error is returned to the caller.
    pub async fn analyze_now(&self, message: &str, language: &str) -> Result<ScanRecord> {
        let result = self.client.analyze(message, language).await?;
        let record = self.ledger.record(message, result, language);
        debug!("Scan {} recorded", record.id);
        Ok(record)
    }

    /// Like [`analyze_now`](Self::analyze_now), but rejects blank input
    /// without contacting the classifier.
    pub async fn scan_text(&self, message: &str, language: &str) -> Result<ScanRecord> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AnalysisError::EmptyMessage);
        }
        self.analyze_now(message, language).await
    }
}
