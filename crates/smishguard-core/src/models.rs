//! Shared data model for the phishing-monitoring pipeline.
//!
//! Wire names follow the remote classifier (`snake_case` analysis results) and
//! the persisted ledger format (`camelCase` stats, millisecond timestamps).

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of scan records kept in the ledger.
pub const HISTORY_CAPACITY: usize = 50;

/// Default analysis language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Verdict returned by the remote classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Whether the message was judged to be phishing.
    pub is_phishing: bool,
    /// Indicators that drove the verdict, most significant first.
    pub key_indicators: Vec<String>,
    /// Free-form explanation of the verdict.
    pub analysis_details: String,
    /// Advice to show the user.
    pub security_recommendation: String,
}

/// One completed analysis, as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub message: String,
    pub result: AnalysisResult,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub language: String,
}

impl ScanRecord {
    /// Creates a record stamped with the current time and a fresh id.
    ///
    /// The timestamp is truncated to milliseconds, the stored precision.
    pub fn new(
        message: impl Into<String>,
        result: AnalysisResult,
        language: impl Into<String>,
    ) -> Self {
        let timestamp = Utc::now().trunc_subsecs(3);
        Self {
            id: generate_id(timestamp),
            message: message.into(),
            result,
            timestamp,
            language: language.into(),
        }
    }
}

/// Lifetime scan counters.
///
/// `total_scans == threats_found + safe_messages` holds after every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStats {
    pub total_scans: u64,
    pub threats_found: u64,
    pub safe_messages: u64,
}

impl AppStats {
    /// Returns the stats after counting one more scan with the given verdict.
    pub fn with_scan(self, is_phishing: bool) -> Self {
        if is_phishing {
            Self {
                total_scans: self.total_scans + 1,
                threats_found: self.threats_found + 1,
                ..self
            }
        } else {
            Self {
                total_scans: self.total_scans + 1,
                safe_messages: self.safe_messages + 1,
                ..self
            }
        }
    }

    /// Returns true if the counters are mutually consistent.
    pub fn is_consistent(&self) -> bool {
        self.total_scans == self.threats_found + self.safe_messages
    }
}

/// The two persisted booleans gating the monitoring pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringFlags {
    /// User preference: monitoring switched on.
    pub monitoring_enabled: bool,
    /// Last known state of the OS listener permission.
    pub listener_enabled: bool,
}

/// Loosely typed `data` bag attached to a platform notification.
///
/// Values are never trusted without a presence and type check; use the
/// accessors rather than indexing the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationData(pub Map<String, Value>);

impl NotificationData {
    /// Returns a string-valued field, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The `type` field.
    pub fn kind(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// The `sender` field.
    pub fn sender(&self) -> Option<&str> {
        self.str_field("sender")
    }
}

impl<const N: usize> From<[(&str, &str); N]> for NotificationData {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        )
    }
}

/// A system notification as delivered by the platform event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    /// Platform request identifier, when the platform provides one.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "packageName")]
    pub source_package: Option<String>,
}

impl RawNotification {
    /// Creates a notification with only a body, stamped now.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            id: None,
            title: None,
            subtitle: None,
            body: body.into(),
            category: None,
            data: None,
            timestamp: Utc::now(),
            source_package: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_data(mut self, data: NotificationData) -> Self {
        self.data = Some(data);
        self
    }

    /// Assigns a unique id if the platform did not supply one.
    pub fn ensure_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(generate_id(self.timestamp));
        }
    }
}

/// A notification that passed the SMS filter and is eligible for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsCandidate {
    pub id: String,
    pub body: String,
    pub sender: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Generates an event/record id of the form `<millis>-<random hex>`.
pub fn generate_id(at: DateTime<Utc>) -> String {
    format!("{}-{:08x}", at.timestamp_millis(), rand::random::<u32>())
}
