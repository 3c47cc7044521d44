//! Seams to the host platform.
//!
//! The controller never talks to the OS directly. It receives notifications
//! through a [`NotificationSource`] and asks a [`PlatformGate`] whether the
//! listener channel and notification permission are in place. Both answers
//! can change at any time behind the app's back, so they are re-queried
//! rather than cached.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use smishguard_core::{PlatformKind, RawNotification};

/// Error reported by a platform capability.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The capability is not available on this platform.
    #[error("{0} is not available on this platform")]
    Unavailable(&'static str),

    /// The platform call failed.
    #[error("platform call failed: {0}")]
    Failed(String),
}

/// OS notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// What the user has to do before monitoring can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsDirective {
    /// Enable notification access for the app in system settings.
    OpenListenerSettings,
    /// Grant the app permission to post and read notifications.
    OpenNotificationSettings,
}

impl SettingsDirective {
    /// User-facing explanation.
    pub fn message(&self) -> &'static str {
        match self {
            Self::OpenListenerSettings => {
                "To monitor SMS messages, enable notification access for SmishGuard in system settings."
            }
            Self::OpenNotificationSettings => {
                "Notification permission is required to monitor SMS messages for phishing attempts."
            }
        }
    }
}

impl std::fmt::Display for SettingsDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Handle to a live listener registration.
///
/// Disposing runs the unsubscribe action exactly once. Dropping an undisposed
/// subscription disposes it.
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps an unsubscribe action.
    pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription with nothing to undo.
    pub fn noop() -> Self {
        Self { dispose: None }
    }

    /// Unsubscribes.
    pub fn dispose(mut self) {
        self.run_dispose();
    }

    fn run_dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.dispose.is_some())
            .finish()
    }
}

/// Delivers system notifications.
pub trait NotificationSource: Send + Sync {
    /// Starts forwarding notifications into `events` until the returned
    /// subscription is disposed.
    fn subscribe(
        &self,
        events: mpsc::UnboundedSender<RawNotification>,
    ) -> Result<Subscription, PlatformError>;
}

/// Answers permission questions about the host platform.
pub trait PlatformGate: Send + Sync {
    /// How notifications reach the app on this platform.
    fn platform(&self) -> PlatformKind;

    /// Whether the privileged notification-listener channel is enabled.
    fn is_listener_enabled(&self) -> Result<bool, PlatformError>;

    /// Current notification permission.
    fn notification_permission(&self) -> Result<PermissionStatus, PlatformError>;

    /// Prompts for notification permission and returns the outcome.
    fn request_notification_permission(&self) -> Result<PermissionStatus, PlatformError>;

    /// Sends the user to the settings screen for a directive.
    fn open_settings(&self, directive: SettingsDirective) -> Result<(), PlatformError>;
}

/// Gate with fixed answers, for hosts without a permission model.
#[derive(Debug)]
pub struct StaticGate {
    platform: PlatformKind,
    listener_enabled: bool,
    permission: PermissionStatus,
}

impl StaticGate {
    pub fn new(platform: PlatformKind, listener_enabled: bool, permission: PermissionStatus) -> Self {
        Self {
            platform,
            listener_enabled,
            permission,
        }
    }

    /// Everything enabled and granted.
    pub fn granted(platform: PlatformKind) -> Self {
        Self::new(platform, true, PermissionStatus::Granted)
    }
}

impl PlatformGate for StaticGate {
    fn platform(&self) -> PlatformKind {
        self.platform
    }

    fn is_listener_enabled(&self) -> Result<bool, PlatformError> {
        Ok(self.listener_enabled)
    }

    fn notification_permission(&self) -> Result<PermissionStatus, PlatformError> {
        Ok(self.permission)
    }

    fn request_notification_permission(&self) -> Result<PermissionStatus, PlatformError> {
        self.notification_permission()
    }

    fn open_settings(&self, directive: SettingsDirective) -> Result<(), PlatformError> {
        info!("Settings requested: {}", directive);
        Ok(())
    }
}
