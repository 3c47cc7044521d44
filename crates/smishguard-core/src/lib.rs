//! SmishGuard Core - notification classification, remote analysis, and alerts.
//!
//! This crate holds the stateless pieces of the SMS phishing-monitoring
//! pipeline:
//!
//! - [`classifier`]: filters raw platform notifications down to SMS candidates
//! - [`analysis`]: async client for the remote phishing classifier
//! - [`alerts`]: local alerts for messages judged to be phishing
//! - [`models`]: the shared data model
//!
//! # Example
//!
//! ```
//! use smishguard_core::{NotificationClassifier, PlatformKind, RawNotification};
//!
//! let classifier = NotificationClassifier::new(PlatformKind::Standard);
//! let raw = RawNotification::new("Your account is suspended, click http://bit.ly/x")
//!     .with_category("sms");
//!
//! assert!(classifier.classify(&raw).is_candidate());
//! ```

pub mod alerts;
pub mod analysis;
pub mod classifier;
pub mod models;

pub use alerts::{AlertDispatcher, AlertError, AlertSink, DesktopAlertSink, PhishingAlert};
pub use analysis::{AnalysisError, ClientConfig, RemoteAnalysisClient};
pub use classifier::{Classification, NotificationClassifier, PlatformKind, RejectReason};
pub use models::{
    AnalysisResult, AppStats, MonitoringFlags, NotificationData, RawNotification, ScanRecord,
    SmsCandidate, DEFAULT_LANGUAGE, HISTORY_CAPACITY,
};
