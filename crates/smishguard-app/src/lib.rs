//! SmishGuard - passive SMS phishing monitoring.
//!
//! This crate wires the library crates together for the `smishguard`
//! binary:
//!
//! - [`AppContext`] opens storage and builds the analysis client
//! - [`source`] provides the line-based notification feed used by
//!   `monitor run`
//! - [`report`] renders command output
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use smishguard_app::{source::IdleSource, AppContext, Settings};
//!
//! let ctx = AppContext::open(Settings::default()).expect("Failed to open storage");
//! let controller = ctx.controller(Arc::new(IdleSource));
//! controller.enable_monitoring().expect("Failed to enable monitoring");
//! ```

pub mod report;
pub mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use smishguard_core::analysis::DEFAULT_TIMEOUT;
use smishguard_core::{
    AlertDispatcher, ClientConfig, PlatformKind, RemoteAnalysisClient, DEFAULT_LANGUAGE,
};
use smishguard_monitor::{
    MonitorConfig, MonitorController, NotificationSource, ScanService, StaticGate,
};
use smishguard_storage::{Database, PersistedFlagStore, ScanLedger};

/// Runtime settings, usually taken from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Classifier base URL; `None` uses the production service.
    pub api_url: Option<String>,
    pub timeout: Duration,
    pub language: String,
    pub platform: PlatformKind,
    /// Database file; `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout: DEFAULT_TIMEOUT,
            language: DEFAULT_LANGUAGE.to_string(),
            platform: PlatformKind::default(),
            db_path: None,
        }
    }
}

impl Settings {
    fn client_config(&self) -> ClientConfig {
        let config = match &self.api_url {
            Some(url) => ClientConfig::with_base_url(url.clone()),
            None => ClientConfig::default(),
        };
        config
            .with_timeout(self.timeout)
            .with_user_agent(format!("smishguard-cli/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Shared services for one invocation.
pub struct AppContext {
    pub settings: Settings,
    pub db_path: PathBuf,
    pub ledger: Arc<ScanLedger>,
    pub flags: PersistedFlagStore,
    pub scanner: ScanService,
    pub gate: Arc<StaticGate>,
}

impl AppContext {
    /// Opens the database and builds the analysis client.
    pub fn open(settings: Settings) -> anyhow::Result<Self> {
        let db_path = match &settings.db_path {
            Some(path) => path.clone(),
            None => Database::default_db_path()?,
        };
        let db = Arc::new(
            Database::with_path(&db_path)
                .with_context(|| format!("Failed to open database at {}", db_path.display()))?,
        );
        tracing::info!("Database opened at {:?}", db_path);

        let client = RemoteAnalysisClient::new(settings.client_config())?;
        tracing::debug!("Classifier endpoint: {}", client.config().analyze_url());

        let ledger = Arc::new(ScanLedger::open(db.clone()));
        let flags = PersistedFlagStore::new(db);
        let scanner = ScanService::new(client, ledger.clone());
        let gate = Arc::new(StaticGate::granted(settings.platform));

        Ok(Self {
            settings,
            db_path,
            ledger,
            flags,
            scanner,
            gate,
        })
    }

    /// Builds a monitoring controller fed by `source`.
    pub fn controller(&self, source: Arc<dyn NotificationSource>) -> MonitorController {
        MonitorController::new(
            MonitorConfig::default().with_language(self.settings.language.clone()),
            self.gate.clone(),
            source,
            self.flags.clone(),
            self.scanner.clone(),
            AlertDispatcher::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smishguard_monitor::MonitorState;

    use crate::source::IdleSource;

    fn settings(dir: &tempfile::TempDir) -> Settings {
        Settings {
            api_url: Some("http://127.0.0.1:9".to_string()),
            db_path: Some(dir.path().join("smishguard.db")),
            ..Settings::default()
        }
    }

    #[test]
    fn test_settings_build_client_config() {
        let settings = Settings {
            api_url: Some("http://localhost:8080/".to_string()),
            timeout: Duration::from_secs(3),
            ..Settings::default()
        };
        let config = settings.client_config();
        assert_eq!(config.analyze_url(), "http://localhost:8080/api/analyze");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.user_agent.starts_with("smishguard-cli/"));
    }

    #[tokio::test]
    async fn test_monitoring_preference_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let ctx = AppContext::open(settings(&dir)).unwrap();
        let controller = ctx.controller(Arc::new(IdleSource));
        assert_eq!(controller.enable_monitoring().unwrap(), MonitorState::Active);
        drop(controller);
        drop(ctx);

        let ctx = AppContext::open(settings(&dir)).unwrap();
        assert!(ctx.flags.get().monitoring_enabled);
        let controller = ctx.controller(Arc::new(IdleSource));
        assert_eq!(controller.initialize().state, MonitorState::Active);

        controller.disable_monitoring().unwrap();
        assert!(!ctx.flags.get().monitoring_enabled);
    }
}
