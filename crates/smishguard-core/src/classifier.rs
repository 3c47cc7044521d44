//! SMS notification classifier.
//!
//! Decides whether a raw platform notification looks like an incoming SMS worth
//! sending for phishing analysis, and extracts the sender. This is the only
//! place platform heuristics live, and it has no side effects.

use serde::{Deserialize, Serialize};

use crate::models::{generate_id, RawNotification, SmsCandidate};

/// Minimum trimmed body length (in characters) for a notification to be analyzed.
pub const MIN_BODY_CHARS: usize = 10;

/// Titles at or above this length are not treated as sender names.
pub const MAX_SENDER_CHARS: usize = 50;

/// Literal marker identifying SMS notifications in titles and subtitles.
pub const SMS_MARKER: &str = "SMS";

/// Category / data tag identifying SMS notifications.
pub const SMS_TAG: &str = "sms";

/// How the platform delivers notifications to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// A privileged notification-listener service that only forwards
    /// SMS-channel notifications.
    NotificationListener,
    /// Plain notification delivery; SMS must be recognized heuristically.
    #[default]
    Standard,
}

impl PlatformKind {
    /// Returns true if this platform gates monitoring on a listener service.
    pub fn requires_listener(&self) -> bool {
        matches!(self, Self::NotificationListener)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotificationListener => "notification_listener",
            Self::Standard => "standard",
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a notification was not forwarded for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Trimmed body shorter than [`MIN_BODY_CHARS`].
    TooShort,
    /// Did not look like an SMS notification.
    NotSms,
}

/// Outcome of classifying one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Candidate(SmsCandidate),
    Rejected(RejectReason),
}

impl Classification {
    pub fn is_candidate(&self) -> bool {
        matches!(self, Self::Candidate(_))
    }

    /// Returns the candidate, if accepted.
    pub fn candidate(self) -> Option<SmsCandidate> {
        match self {
            Self::Candidate(c) => Some(c),
            Self::Rejected(_) => None,
        }
    }
}

/// Filters raw notifications down to SMS candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationClassifier {
    platform: PlatformKind,
}

impl NotificationClassifier {
    pub fn new(platform: PlatformKind) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> PlatformKind {
        self.platform
    }

    /// Classifies a notification. First matching rule wins.
    pub fn classify(&self, raw: &RawNotification) -> Classification {
        if raw.body.trim().chars().count() < MIN_BODY_CHARS {
            return Classification::Rejected(RejectReason::TooShort);
        }

        // Listener-channel events are SMS-scoped upstream.
        if self.platform == PlatformKind::Standard && !looks_like_sms(raw) {
            return Classification::Rejected(RejectReason::NotSms);
        }

        Classification::Candidate(SmsCandidate {
            id: raw.id.clone().unwrap_or_else(|| generate_id(raw.timestamp)),
            body: raw.body.clone(),
            sender: extract_sender(raw),
            timestamp: raw.timestamp,
        })
    }
}

fn looks_like_sms(raw: &RawNotification) -> bool {
    let tagged = raw
        .category
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(SMS_TAG));
    let typed = raw
        .data
        .as_ref()
        .and_then(|d| d.kind())
        .is_some_and(|k| k == SMS_TAG);
    let marked = [&raw.title, &raw.subtitle]
        .into_iter()
        .flatten()
        .any(|s| s.contains(SMS_MARKER));

    tagged || typed || marked
}

/// Extracts the sender: `data.sender`, else a short title without the SMS marker.
pub fn extract_sender(raw: &RawNotification) -> Option<String> {
    if let Some(sender) = raw.data.as_ref().and_then(|d| d.sender()) {
        return Some(sender.to_string());
    }

    raw.title
        .as_deref()
        .filter(|t| !t.contains(SMS_MARKER) && t.chars().count() < MAX_SENDER_CHARS)
        .map(str::to_string)
}
