//! Local phishing alerts.
//!
//! When a candidate SMS is classified as phishing, the [`AlertDispatcher`]
//! builds one [`PhishingAlert`] and hands it to an [`AlertSink`] for immediate
//! display.
//!
//! ## Behaviour
//!
//! - One alert per phishing verdict, never for safe messages
//! - Shows the sender (or "Unknown") and a short preview of the message
//! - Carries the full indicators and analysis details as payload
//! - Delivery failures are logged and swallowed; they never reach the pipeline

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{AnalysisResult, SmsCandidate};

/// Alert title.
pub const ALERT_TITLE: &str = "⚠️ Phishing Alert";

/// Payload discriminator used for deep-link handling.
pub const ALERT_PAYLOAD_TYPE: &str = "phishing_alert";

/// Maximum characters of the message shown in the alert body.
pub const PREVIEW_MAX_LEN: usize = 80;

/// Error raised by an alert sink.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The platform refused or failed to show the alert.
    #[error("failed to deliver alert: {0}")]
    Delivery(String),
}

/// Data attached to an alert for later inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    /// Always [`ALERT_PAYLOAD_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    pub sms_id: String,
    pub sms_body: String,
    pub indicators: Vec<String>,
    pub details: String,
}

/// A user-visible alert about a suspicious message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhishingAlert {
    pub title: String,
    pub body: String,
    pub payload: AlertPayload,
}

impl PhishingAlert {
    /// Builds the alert for a candidate and its verdict.
    pub fn new(candidate: &SmsCandidate, result: &AnalysisResult) -> Self {
        let sender = candidate.sender.as_deref().unwrap_or("Unknown");
        let body = format!(
            "Suspicious message detected from {}. Tap to view details.\n{}",
            sender,
            create_preview(&candidate.body)
        );

        Self {
            title: ALERT_TITLE.to_string(),
            body,
            payload: AlertPayload {
                kind: ALERT_PAYLOAD_TYPE.to_string(),
                sms_id: candidate.id.clone(),
                sms_body: candidate.body.clone(),
                indicators: result.key_indicators.clone(),
                details: result.analysis_details.clone(),
            },
        }
    }
}

/// Truncates a message for display, dropping control characters.
pub fn create_preview(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control())
        .take(PREVIEW_MAX_LEN)
        .collect();

    if text.chars().count() > PREVIEW_MAX_LEN {
        format!("{}...", cleaned)
    } else {
        cleaned
    }
}

/// Something that can put an alert in front of the user.
pub trait AlertSink: Send + Sync {
    /// Shows the alert immediately.
    fn deliver(&self, alert: &PhishingAlert) -> Result<(), AlertError>;
}

/// Shows alerts as desktop notifications.
#[derive(Debug, Clone, Default)]
pub struct DesktopAlertSink;

impl DesktopAlertSink {
    pub fn new() -> Self {
        Self
    }
}

impl AlertSink for DesktopAlertSink {
    #[cfg(feature = "notifications")]
    fn deliver(&self, alert: &PhishingAlert) -> Result<(), AlertError> {
        use notify_rust::Notification;

        Notification::new()
            .summary(&alert.title)
            .body(&alert.body)
            .appname("SmishGuard")
            .timeout(notify_rust::Timeout::Milliseconds(10_000))
            .show()
            .map(|_| ())
            .map_err(|e| AlertError::Delivery(e.to_string()))
    }

    /// Fallback when notifications are compiled out.
    #[cfg(not(feature = "notifications"))]
    fn deliver(&self, alert: &PhishingAlert) -> Result<(), AlertError> {
        info!("{}: {}", alert.title, alert.body);
        Ok(())
    }
}

/// Raises phishing alerts; stateless apart from its sink.
#[derive(Clone)]
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher").finish_non_exhaustive()
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(DesktopAlertSink::new()))
    }
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    /// Raises an alert for a phishing verdict.
    ///
    /// Does nothing for safe verdicts. Never fails; delivery errors are logged.
    pub fn raise(&self, candidate: &SmsCandidate, result: &AnalysisResult) {
        if !result.is_phishing {
            debug!("Skipping alert for safe message {}", candidate.id);
            return;
        }

        let alert = PhishingAlert::new(candidate, result);
        match self.sink.deliver(&alert) {
            Ok(()) => info!("Phishing alert raised for message {}", candidate.id),
            Err(e) => warn!("Phishing alert for message {} not delivered: {}", candidate.id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<Vec<PhishingAlert>>,
    }

    impl AlertSink for RecordingSink {
        fn deliver(&self, alert: &PhishingAlert) -> Result<(), AlertError> {
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl AlertSink for FailingSink {
        fn deliver(&self, _alert: &PhishingAlert) -> Result<(), AlertError> {
            Err(AlertError::Delivery("permission revoked".to_string()))
        }
    }

    fn candidate(sender: Option<&str>, body: &str) -> SmsCandidate {
        SmsCandidate {
            id: "sms-1".to_string(),
            body: body.to_string(),
            sender: sender.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    fn verdict(is_phishing: bool) -> AnalysisResult {
        AnalysisResult {
            is_phishing,
            key_indicators: vec!["urgency".to_string(), "shortened-link".to_string()],
            analysis_details: "Pressure tactics with an obfuscated link".to_string(),
            security_recommendation: "Delete the message".to_string(),
        }
    }

    #[test]
    fn alert_carries_payload() {
        let alert = PhishingAlert::new(
            &candidate(Some("Bank"), "Your account is suspended"),
            &verdict(true),
        );

        assert_eq!(alert.title, ALERT_TITLE);
        assert!(alert.body.contains("from Bank"));
        assert!(alert.body.contains("Your account is suspended"));
        assert_eq!(alert.payload.kind, "phishing_alert");
        assert_eq!(alert.payload.sms_id, "sms-1");
        assert_eq!(alert.payload.indicators, vec!["urgency", "shortened-link"]);
        assert_eq!(alert.payload.details, "Pressure tactics with an obfuscated link");
    }

    #[test]
    fn alert_names_unknown_sender() {
        let alert = PhishingAlert::new(&candidate(None, "Your account is suspended"), &verdict(true));
        assert!(alert.body.contains("from Unknown"));
    }

    #[test]
    fn payload_serializes_type_tag() {
        let alert = PhishingAlert::new(&candidate(None, "Your account is suspended"), &verdict(true));
        let json = serde_json::to_value(&alert.payload).unwrap();
        assert_eq!(json["type"], "phishing_alert");
        assert_eq!(json["smsId"], "sms-1");
    }

    #[test]
    fn preview_truncates_long_messages() {
        let long = "a".repeat(PREVIEW_MAX_LEN + 20);
        let preview = create_preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_MAX_LEN + 3);
        assert!(preview.ends_with("..."));

        assert_eq!(create_preview("line one\nline two"), "line oneline two");
    }

    #[test]
    fn dispatcher_raises_exactly_one_alert() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = AlertDispatcher::new(sink.clone());

        dispatcher.raise(&candidate(Some("Bank"), "Your account is suspended"), &verdict(true));

        let alerts = sink.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].payload.sms_body, "Your account is suspended");
    }

    #[test]
    fn dispatcher_ignores_safe_verdicts() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = AlertDispatcher::new(sink.clone());

        dispatcher.raise(&candidate(None, "See you at dinner tonight"), &verdict(false));

        assert!(sink.alerts.lock().unwrap().is_empty());
    }

    #[test]
    fn dispatcher_swallows_delivery_failures() {
        let dispatcher = AlertDispatcher::new(Arc::new(FailingSink));
        dispatcher.raise(&candidate(None, "Your account is suspended"), &verdict(true));
    }
}
