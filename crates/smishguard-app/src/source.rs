//! Notification feeds for the command line.
//!
//! `monitor run` reads one notification per line. A line holding a JSON
//! object is parsed as a [`RawNotification`] (the same shape a platform
//! listener would forward); any other non-blank line is taken as the body of
//! an SMS.

use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use smishguard_core::RawNotification;
use smishguard_monitor::{NotificationSource, PlatformError, Subscription};

/// Category attached to plain-text lines.
const PLAIN_TEXT_CATEGORY: &str = "sms";

/// Parses one input line. Returns `None` for blank or malformed lines.
pub fn parse_line(line: &str) -> Option<RawNotification> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        return match serde_json::from_str(line) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!("Skipping malformed notification: {}", e);
                None
            }
        };
    }

    Some(RawNotification::new(line).with_category(PLAIN_TEXT_CATEGORY))
}

#[derive(Default)]
struct Slot {
    token: u64,
    events: Option<mpsc::UnboundedSender<RawNotification>>,
}

/// Line-oriented notification feed.
///
/// Lines are read on a dedicated OS thread so a blocked read never holds up
/// the runtime. Notifications that arrive while nobody is subscribed are
/// dropped, as they would be by the OS.
pub struct LineSource {
    slot: Arc<Mutex<Slot>>,
    next_token: AtomicU64,
    delivered: Arc<AtomicUsize>,
    closed: watch::Receiver<bool>,
    closer: Mutex<Option<watch::Sender<bool>>>,
}

impl Default for LineSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource {
    pub fn new() -> Self {
        let (closer, closed) = watch::channel(false);
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            next_token: AtomicU64::new(1),
            delivered: Arc::new(AtomicUsize::new(0)),
            closed,
            closer: Mutex::new(Some(closer)),
        }
    }

    /// Starts reading `reader` in the background. Only the first call has
    /// any effect.
    pub fn spawn_reader<R: Read + Send + 'static>(&self, reader: R) {
        let Some(closer) = self
            .closer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("Notification reader already started");
            return;
        };

        let slot = self.slot.clone();
        let delivered = self.delivered.clone();
        std::thread::spawn(move || {
            for line in BufReader::new(reader).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read notification input: {}", e);
                        break;
                    }
                };
                let Some(raw) = parse_line(&line) else {
                    continue;
                };

                let slot = lock(&slot);
                match &slot.events {
                    Some(events) if events.send(raw).is_ok() => {
                        delivered.fetch_add(1, Ordering::SeqCst);
                    }
                    _ => debug!("No listener, notification dropped"),
                }
            }

            debug!("Notification input closed");
            let _ = closer.send(true);
        });
    }

    /// Number of notifications handed to a subscriber.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Resolves once the input has been fully read.
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|done| *done).await;
    }
}

impl NotificationSource for LineSource {
    fn subscribe(
        &self,
        events: mpsc::UnboundedSender<RawNotification>,
    ) -> Result<Subscription, PlatformError> {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        {
            let mut slot = lock(&self.slot);
            slot.token = token;
            slot.events = Some(events);
        }

        let slot = self.slot.clone();
        Ok(Subscription::new(move || {
            let mut slot = lock(&slot);
            if slot.token == token {
                slot.events = None;
            }
        }))
    }
}

/// Source for commands that change monitoring settings without listening.
#[derive(Debug, Default)]
pub struct IdleSource;

impl NotificationSource for IdleSource {
    fn subscribe(
        &self,
        _events: mpsc::UnboundedSender<RawNotification>,
    ) -> Result<Subscription, PlatformError> {
        Ok(Subscription::noop())
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
