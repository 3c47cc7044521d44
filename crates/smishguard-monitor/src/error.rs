//! Error types for the monitoring lifecycle.

use thiserror::Error;

use smishguard_storage::StorageError;

use crate::platform::{PlatformError, SettingsDirective};

/// Monitoring lifecycle errors.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A permission gate is not satisfied; the user has to act first.
    #[error("monitoring cannot start: {0}")]
    PermissionDenied(SettingsDirective),

    /// A platform query or subscription failed.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Persisting a monitoring flag failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MonitorError {
    /// The settings screen that would resolve this error, if any.
    pub fn directive(&self) -> Option<SettingsDirective> {
        match self {
            Self::PermissionDenied(directive) => Some(*directive),
            _ => None,
        }
    }
}

/// Result type for monitoring operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
