//! Monitoring lifecycle.
//!
//! [`MonitorController`] owns the single live notification subscription and
//! is the only thing that starts or stops it.
//!
//! ## States
//!
//! - **Disabled**: no subscription
//! - **AwaitingPermission**: monitoring is wanted but a permission gate is
//!   not satisfied yet
//! - **Active**: exactly one subscription is live
//! - **Error**: the last permission query failed unexpectedly
//!
//! ## Pipeline
//!
//! Notifications arrive on one pump task and are classified in arrival
//! order. Each SMS candidate is analyzed on its own task, so verdicts land in
//! the ledger in completion order. Stopping the controller keeps new events
//! out but never cancels analyses already running.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use smishguard_core::{
    AlertDispatcher, AnalysisResult, Classification, NotificationClassifier, PlatformKind,
    RawNotification, SmsCandidate, DEFAULT_LANGUAGE,
};
use smishguard_storage::PersistedFlagStore;

use crate::error::{MonitorError, Result};
use crate::platform::{NotificationSource, PlatformGate, SettingsDirective, Subscription};
use crate::scan::ScanService;

/// Number of recent notification ids remembered for duplicate suppression.
pub const DEFAULT_DEDUP_WINDOW: usize = 128;

/// Monitoring configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Language sent with every analysis request.
    pub language: String,
    /// How many recent notification ids to remember. Zero disables
    /// duplicate suppression.
    pub dedup_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

impl MonitorConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    #[default]
    Disabled,
    AwaitingPermission,
    Active,
    Error,
}

impl MonitorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::AwaitingPermission => "awaiting_permission",
            Self::Active => "active",
            Self::Error => "error",
        }
    }

    /// Returns a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Disabled => "Monitoring is off",
            Self::AwaitingPermission => "Monitoring is waiting for permission",
            Self::Active => "Monitoring incoming SMS messages",
            Self::Error => "Monitoring status could not be determined",
        }
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot returned by [`MonitorController::refresh_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringStatus {
    /// User preference.
    pub monitoring_enabled: bool,
    /// Listener channel enabled (or last known value if the query failed).
    pub listener_enabled: bool,
    /// Notification permission granted.
    pub has_permissions: bool,
    /// Monitoring is wanted and every gate required on this platform passes.
    pub is_active: bool,
    pub state: MonitorState,
}

impl MonitoringStatus {
    fn errored() -> Self {
        Self {
            monitoring_enabled: false,
            listener_enabled: false,
            has_permissions: false,
            is_active: false,
            state: MonitorState::Error,
        }
    }
}

struct Session {
    subscription: Subscription,
    pump: JoinHandle<()>,
}

impl Session {
    fn close(self) {
        self.subscription.dispose();
        self.pump.abort();
    }
}

struct Inner {
    state: MonitorState,
    session: Option<Session>,
}

/// Starts, stops and reports on passive SMS monitoring.
///
/// Lifecycle methods spawn Tokio tasks and must be called from within a
/// runtime.
pub struct MonitorController {
    gate: Arc<dyn PlatformGate>,
    source: Arc<dyn NotificationSource>,
    flags: PersistedFlagStore,
    pipeline: Pipeline,
    dedup_window: usize,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for MonitorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MonitorController")
            .field("state", &inner.state)
            .field("subscribed", &inner.session.is_some())
            .finish_non_exhaustive()
    }
}

impl MonitorController {
    pub fn new(
        config: MonitorConfig,
        gate: Arc<dyn PlatformGate>,
        source: Arc<dyn NotificationSource>,
        flags: PersistedFlagStore,
        scanner: ScanService,
        alerts: AlertDispatcher,
    ) -> Self {
        let pipeline = Pipeline {
            classifier: NotificationClassifier::new(gate.platform()),
            scanner,
            alerts,
            language: config.language,
            in_flight: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(AtomicUsize::new(0)),
        };

        Self {
            gate,
            source,
            flags,
            pipeline,
            dedup_window: config.dedup_window,
            inner: Mutex::new(Inner {
                state: MonitorState::Disabled,
                session: None,
            }),
        }
    }

    pub fn platform(&self) -> PlatformKind {
        self.gate.platform()
    }

    pub fn state(&self) -> MonitorState {
        self.lock().state
    }

    /// Returns true while a subscription is live.
    pub fn is_monitoring(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Number of analyses currently running.
    pub fn in_flight(&self) -> usize {
        self.pipeline.in_flight.load(Ordering::SeqCst)
    }

    /// Notifications taken off the feed so far, accepted or not.
    pub fn events_seen(&self) -> usize {
        self.pipeline.received.load(Ordering::SeqCst)
    }

    /// Startup path: refreshes status and resumes monitoring if the user
    /// wants it and every gate passes.
    pub fn initialize(&self) -> MonitoringStatus {
        let status = self.refresh_status();
        if !status.is_active || self.is_monitoring() {
            return status;
        }

        if let Err(e) = self.start_monitoring() {
            warn!("Failed to resume monitoring: {}", e);
        }
        MonitoringStatus {
            state: self.state(),
            ..status
        }
    }

    /// Turns monitoring on.
    ///
    /// The preference is saved before any gate is checked, so a denied
    /// permission leaves the controller waiting rather than off.
    pub fn enable_monitoring(&self) -> Result<MonitorState> {
        info!("Enabling SMS monitoring");
        self.flags.set_monitoring_enabled(true)?;

        {
            let mut inner = self.lock();
            if inner.session.is_none() {
                inner.state = MonitorState::AwaitingPermission;
            }
        }

        self.start_monitoring()
    }

    /// Subscribes to notifications if monitoring is enabled and not yet
    /// running. Calling it again while active does nothing.
    pub fn start_monitoring(&self) -> Result<MonitorState> {
        let mut inner = self.lock();

        if inner.session.is_some() {
            debug!("Monitoring already active");
            return Ok(inner.state);
        }
        if !self.flags.get().monitoring_enabled {
            debug!("Monitoring not enabled, not starting");
            return Ok(inner.state);
        }

        if let Err(e) = self.check_gates() {
            inner.state = match e {
                MonitorError::PermissionDenied(_) => MonitorState::AwaitingPermission,
                _ => MonitorState::Error,
            };
            warn!("Cannot start monitoring: {}", e);
            return Err(e);
        }

        let (events, receiver) = mpsc::unbounded_channel();
        let subscription = match self.source.subscribe(events) {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("Failed to subscribe to notifications: {}", e);
                inner.state = MonitorState::Error;
                return Err(e.into());
            }
        };
        let pump = tokio::spawn(self.pipeline.clone().pump(receiver, self.dedup_window));

        inner.session = Some(Session { subscription, pump });
        inner.state = MonitorState::Active;
        info!("SMS monitoring started ({} platform)", self.gate.platform());
        Ok(MonitorState::Active)
    }

    /// Turns monitoring off and saves the preference.
    ///
    /// The subscription is torn down even if saving fails.
    pub fn disable_monitoring(&self) -> Result<()> {
        info!("Disabling SMS monitoring");
        let saved = self.flags.set_monitoring_enabled(false);
        self.stop_monitoring();
        saved.map_err(MonitorError::from)
    }

    /// Disposes the subscription, if any. Safe to call repeatedly.
    pub fn stop_monitoring(&self) {
        let mut inner = self.lock();
        if let Some(session) = inner.session.take() {
            session.close();
            info!("SMS monitoring stopped");
        }
        inner.state = MonitorState::Disabled;
    }

    /// Re-queries the platform and reports the current status.
    ///
    /// The listener answer is cached in the flag store. Never starts or stops
    /// the subscription.
    pub fn refresh_status(&self) -> MonitoringStatus {
        let flags = self.flags.get();
        let listener_enabled = self.query_listener();

        let has_permissions = match self.gate.notification_permission() {
            Ok(status) => status.is_granted(),
            Err(e) => {
                error!("Failed to query notification permission: {}", e);
                self.lock().state = MonitorState::Error;
                return MonitoringStatus::errored();
            }
        };

        let listener_ok = listener_enabled || !self.gate.platform().requires_listener();
        let is_active = flags.monitoring_enabled && listener_ok && has_permissions;

        let mut inner = self.lock();
        inner.state = if inner.session.is_some() {
            MonitorState::Active
        } else if flags.monitoring_enabled {
            MonitorState::AwaitingPermission
        } else {
            MonitorState::Disabled
        };

        MonitoringStatus {
            monitoring_enabled: flags.monitoring_enabled,
            listener_enabled,
            has_permissions,
            is_active,
            state: inner.state,
        }
    }

    /// Sends the user to the settings screen that resolves `directive`.
    pub fn open_settings(&self, directive: SettingsDirective) -> Result<()> {
        self.gate.open_settings(directive)?;
        Ok(())
    }

    fn check_gates(&self) -> Result<()> {
        if self.gate.platform().requires_listener() && !self.query_listener() {
            return Err(MonitorError::PermissionDenied(
                SettingsDirective::OpenListenerSettings,
            ));
        }

        let mut permission = self.gate.notification_permission()?;
        if !permission.is_granted() {
            info!("Requesting notification permission");
            permission = self.gate.request_notification_permission()?;
        }
        if !permission.is_granted() {
            return Err(MonitorError::PermissionDenied(
                SettingsDirective::OpenNotificationSettings,
            ));
        }

        Ok(())
    }

    fn query_listener(&self) -> bool {
        match self.gate.is_listener_enabled() {
            Ok(enabled) => {
                if let Err(e) = self.flags.set_listener_enabled(enabled) {
                    warn!("Failed to cache listener status: {}", e);
                }
                enabled
            }
            Err(e) => {
                warn!("Listener status query failed, using stored value: {}", e);
                self.flags.get().listener_enabled
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-event processing shared by the pump and the analysis tasks.
#[derive(Clone)]
struct Pipeline {
    classifier: NotificationClassifier,
    scanner: ScanService,
    alerts: AlertDispatcher,
    language: String,
    in_flight: Arc<AtomicUsize>,
    received: Arc<AtomicUsize>,
}

impl Pipeline {
    async fn pump(self, mut events: mpsc::UnboundedReceiver<RawNotification>, dedup_window: usize) {
        let mut seen = RecentIds::new(dedup_window);

        while let Some(raw) = events.recv().await {
            self.handle(raw, &mut seen);
            self.received.fetch_add(1, Ordering::SeqCst);
        }

        debug!("Notification channel closed");
    }

    fn handle(&self, mut raw: RawNotification, seen: &mut RecentIds) {
        raw.ensure_id();

        let candidate = match self.classifier.classify(&raw) {
            Classification::Candidate(candidate) => candidate,
            Classification::Rejected(reason) => {
                debug!("Ignoring notification {:?}: {:?}", raw.id, reason);
                return;
            }
        };

        if !seen.insert(&candidate.id) {
            debug!("Ignoring repeated notification {}", candidate.id);
            return;
        }

        self.spawn_analysis(candidate);
    }

    fn spawn_analysis(&self, candidate: SmsCandidate) {
        let pipeline = self.clone();
        let guard = InFlightGuard::enter(&self.in_flight);

        tokio::spawn(async move {
            let _guard = guard;
            pipeline.analyze(candidate).await;
        });
    }

    async fn analyze(&self, candidate: SmsCandidate) {
        debug!("Analyzing message {}", candidate.id);
        match self
            .scanner
            .analyze_now(&candidate.body, &self.language)
            .await
        {
            Ok(record) if record.result.is_phishing => self.alert(candidate, record.result).await,
            Ok(_) => {}
            Err(e) => warn!("Analysis of message {} failed: {}", candidate.id, e),
        }
    }

    /// Sinks may block (desktop notification servers are synchronous), so
    /// delivery runs on the blocking pool.
    async fn alert(&self, candidate: SmsCandidate, result: AnalysisResult) {
        let id = candidate.id.clone();
        let alerts = self.alerts.clone();
        let delivery = tokio::task::spawn_blocking(move || alerts.raise(&candidate, &result));
        if let Err(e) = delivery.await {
            warn!("Alert task for message {} did not finish: {}", id, e);
        }
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded memory of recently seen ids, oldest evicted first.
struct RecentIds {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Returns false if `id` was seen recently.
    fn insert(&mut self, id: &str) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }
}
