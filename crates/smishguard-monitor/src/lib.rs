//! SmishGuard Monitor - passive SMS phishing monitoring.
//!
//! Wires the platform notification feed to the classifier, the remote
//! analysis service, the scan ledger and local alerts:
//!
//! ```text
//! NotificationSource -> pump -> classify -> analyze (one task each)
//!                                              |-> ScanLedger::record
//!                                              '-> AlertDispatcher::raise (phishing only)
//! ```
//!
//! [`MonitorController`] owns the lifecycle; [`ScanService`] is also used
//! directly for manual scans.

pub mod controller;
pub mod error;
pub mod platform;
pub mod scan;

#[cfg(test)]
mod test_support;

pub use controller::{
    MonitorConfig, MonitorController, MonitorState, MonitoringStatus, DEFAULT_DEDUP_WINDOW,
};
pub use error::{MonitorError, Result};
pub use platform::{
    NotificationSource, PermissionStatus, PlatformError, PlatformGate, SettingsDirective,
    StaticGate, Subscription,
};
pub use scan::ScanService;
