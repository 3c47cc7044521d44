//! Test doubles: a mock classifier backend and scriptable platform seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use smishguard_core::{
    AlertError, AlertSink, ClientConfig, PhishingAlert, PlatformKind, RawNotification,
    RemoteAnalysisClient,
};
use smishguard_storage::{Database, ScanLedger};

use crate::platform::{
    NotificationSource, PermissionStatus, PlatformError, PlatformGate, SettingsDirective,
    Subscription,
};
use crate::scan::ScanService;

/// Delay applied to messages containing "slow".
pub const SLOW_DELAY: Duration = Duration::from_millis(400);

/// Local classifier stand-in.
///
/// Messages containing "fail" get a 500 and "slow" ones are delayed.
/// Pressure wording ("urgent", "verify", "suspended") flags `urgency` and a
/// `bit.ly` link flags `shortened-link`; any indicator makes it phishing.
pub struct MockBackend {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route("/api/analyze", post(analyze))
            .with_state(requests.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn analyze(State(requests): State<Arc<Mutex<Vec<String>>>>, Json(body): Json<Value>) -> Response {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    requests.lock().unwrap().push(message.clone());

    let lower = message.to_lowercase();
    if lower.contains("slow") {
        tokio::time::sleep(SLOW_DELAY).await;
    }
    if lower.contains("fail") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "backend unavailable"})),
        )
            .into_response();
    }

    let mut indicators = Vec::new();
    if ["urgent", "verify", "suspended"].iter().any(|w| lower.contains(w)) {
        indicators.push("urgency");
    }
    if lower.contains("bit.ly/") {
        indicators.push("shortened-link");
    }
    let is_phishing = !indicators.is_empty();
    Json(json!({
        "is_phishing": is_phishing,
        "key_indicators": indicators,
        "analysis_details": "mock verdict",
        "security_recommendation": "mock advice"
    }))
    .into_response()
}

pub fn client(url: &str) -> RemoteAnalysisClient {
    RemoteAnalysisClient::new(ClientConfig::with_base_url(url).with_timeout(Duration::from_secs(5)))
        .unwrap()
}

pub fn scanner(url: &str) -> (ScanService, Arc<ScanLedger>) {
    let db = Arc::new(Database::in_memory().unwrap());
    let ledger = Arc::new(ScanLedger::open(db));
    (ScanService::new(client(url), ledger.clone()), ledger)
}

/// Waits until the ledger holds at least `n` records.
pub async fn wait_for_history(ledger: &ScanLedger, n: usize) {
    let mut rx = ledger.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.history.len() >= n))
        .await
        .expect("timed out waiting for scan records")
        .expect("ledger closed");
}

#[derive(Default)]
struct SourceState {
    next_id: usize,
    subscribers: HashMap<usize, mpsc::UnboundedSender<RawNotification>>,
    subscribes: usize,
    disposals: usize,
}

/// Notification source driven by the test.
#[derive(Clone, Default)]
pub struct ChannelSource {
    state: Arc<Mutex<SourceState>>,
}

impl ChannelSource {
    /// Delivers a notification to every live subscriber. Returns how many got it.
    pub fn emit(&self, raw: RawNotification) -> usize {
        let state = self.state.lock().unwrap();
        state
            .subscribers
            .values()
            .filter(|tx| tx.send(raw.clone()).is_ok())
            .count()
    }

    pub fn active(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }

    pub fn subscribes(&self) -> usize {
        self.state.lock().unwrap().subscribes
    }

    pub fn disposals(&self) -> usize {
        self.state.lock().unwrap().disposals
    }
}

impl NotificationSource for ChannelSource {
    fn subscribe(
        &self,
        events: mpsc::UnboundedSender<RawNotification>,
    ) -> Result<Subscription, PlatformError> {
        let id = {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribes += 1;
            state.subscribers.insert(id, events);
            id
        };

        let state = self.state.clone();
        Ok(Subscription::new(move || {
            let mut state = state.lock().unwrap();
            state.subscribers.remove(&id);
            state.disposals += 1;
        }))
    }
}

/// Platform gate with switchable answers and failure injection.
pub struct TestGate {
    platform: PlatformKind,
    pub listener_enabled: AtomicBool,
    pub fail_listener_query: AtomicBool,
    pub permission: Mutex<PermissionStatus>,
    pub grant_on_request: AtomicBool,
    pub fail_permission_query: AtomicBool,
    pub requests: AtomicUsize,
    pub opened: Mutex<Vec<SettingsDirective>>,
}

impl TestGate {
    pub fn new(platform: PlatformKind) -> Self {
        Self {
            platform,
            listener_enabled: AtomicBool::new(false),
            fail_listener_query: AtomicBool::new(false),
            permission: Mutex::new(PermissionStatus::Undetermined),
            grant_on_request: AtomicBool::new(true),
            fail_permission_query: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Listener enabled and permission already granted.
    pub fn ready(platform: PlatformKind) -> Self {
        let gate = Self::new(platform);
        gate.listener_enabled.store(true, Ordering::SeqCst);
        *gate.permission.lock().unwrap() = PermissionStatus::Granted;
        gate
    }
}

impl PlatformGate for TestGate {
    fn platform(&self) -> PlatformKind {
        self.platform
    }

    fn is_listener_enabled(&self) -> Result<bool, PlatformError> {
        if self.fail_listener_query.load(Ordering::SeqCst) {
            return Err(PlatformError::Failed("listener query failed".into()));
        }
        Ok(self.listener_enabled.load(Ordering::SeqCst))
    }

    fn notification_permission(&self) -> Result<PermissionStatus, PlatformError> {
        if self.fail_permission_query.load(Ordering::SeqCst) {
            return Err(PlatformError::Failed("permission query failed".into()));
        }
        Ok(*self.permission.lock().unwrap())
    }

    fn request_notification_permission(&self) -> Result<PermissionStatus, PlatformError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut permission = self.permission.lock().unwrap();
        *permission = if self.grant_on_request.load(Ordering::SeqCst) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        Ok(*permission)
    }

    fn open_settings(&self, directive: SettingsDirective) -> Result<(), PlatformError> {
        self.opened.lock().unwrap().push(directive);
        Ok(())
    }
}

/// Alert sink that keeps every alert.
#[derive(Default)]
pub struct RecordingSink {
    pub alerts: Mutex<Vec<PhishingAlert>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

impl AlertSink for RecordingSink {
    fn deliver(&self, alert: &PhishingAlert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Sink whose deliveries block the calling thread until [`release`] is
/// called, giving up after two seconds.
///
/// [`release`]: GatedSink::release
#[derive(Default)]
pub struct GatedSink {
    released: Mutex<bool>,
    wake: Condvar,
    pub waiting: AtomicUsize,
    pub delivered: AtomicUsize,
}

impl GatedSink {
    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.wake.notify_all();
    }
}

impl AlertSink for GatedSink {
    fn deliver(&self, _alert: &PhishingAlert) -> Result<(), AlertError> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let released = self.released.lock().unwrap();
        let (released, _) = self
            .wake
            .wait_timeout_while(released, Duration::from_secs(2), |open| !*open)
            .unwrap();
        let opened = *released;
        drop(released);
        self.waiting.fetch_sub(1, Ordering::SeqCst);

        if !opened {
            return Err(AlertError::Delivery("gate never opened".to_string()));
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
