//! Alert Stream Implementation
//!
//! Owns the push subscription and the snapshot fetch for one view. Both
//! producers feed the same merge; the shared state lock is the
//! serialization point.

use crate::config::{ReconnectConfig, StreamConfig};
use crate::error::StreamError;
use crate::state::{ConnectionState, PanelState, StreamEvent};
use alert_client::{
    ClientError, PushConnector, SnapshotClient, SnapshotSource, WsPushConnector,
};
use alerting::{
    parse_push_frame, Alert, AlertBook, AlertId, MergeOutcome, Notification, NotificationCenter,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// State shared between the stream handle and its tasks
struct Shared {
    book: AlertBook,
    notifications: NotificationCenter,
    connection: ConnectionState,
    panel: PanelState,
    /// Bumped on every open and close; tasks from older sessions are ignored
    generation: u64,
}

impl Shared {
    /// Merge one alert, collecting the events it causes
    fn merge(&mut self, alert: Alert, events: &mut Vec<StreamEvent>) -> MergeOutcome {
        let outcome = self.book.merge(alert.clone());
        if outcome.changed() {
            events.push(StreamEvent::AlertsChanged);
        }
        if let Some(notification) = self
            .notifications
            .on_merge(&alert, &outcome, Instant::now())
        {
            events.push(StreamEvent::Notified(notification));
        }
        outcome
    }

    fn set_connection(&mut self, state: ConnectionState, events: &mut Vec<StreamEvent>) {
        if self.connection != state {
            debug!("Push connection {:?} -> {:?}", self.connection, state);
            self.connection = state;
            events.push(StreamEvent::ConnectionChanged(state));
        }
    }
}

/// Parse a push frame received now
fn alert_from_frame(raw: &str) -> Alert {
    let received_at = Utc::now();
    parse_push_frame(raw, received_at).into_alert(received_at)
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn publish(events: &broadcast::Sender<StreamEvent>, pending: Vec<StreamEvent>) {
    for event in pending {
        // No receivers is fine
        let _ = events.send(event);
    }
}

/// Handles owned by an open session
struct Session {
    shutdown: watch::Sender<bool>,
    snapshot_task: JoinHandle<()>,
    push_task: JoinHandle<()>,
}

impl Session {
    fn is_active(&self) -> bool {
        !self.snapshot_task.is_finished() || !self.push_task.is_finished()
    }
}

/// Per-session context handed to the producer tasks
#[derive(Clone)]
struct TaskContext {
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<StreamEvent>,
    generation: u64,
}

impl TaskContext {
    /// Run `f` against the shared state if this session is still current
    fn with_current<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Shared, &mut Vec<StreamEvent>),
    {
        let mut pending = Vec::new();
        {
            let mut shared = lock(&self.shared);
            if shared.generation != self.generation {
                return false;
            }
            f(&mut shared, &mut pending);
        }
        publish(&self.events, pending);
        true
    }

    fn set_connection(&self, state: ConnectionState) -> bool {
        self.with_current(|shared, events| shared.set_connection(state, events))
    }

    fn push_failed(&self, reason: String) {
        warn!("Push connection failed: {}", reason);
        self.with_current(|_, events| events.push(StreamEvent::PushFailed(reason)));
    }
}

/// Live, de-duplicated, recency-ordered view of alerts
///
/// Must be opened from within a Tokio runtime.
pub struct AlertStream {
    config: StreamConfig,
    push_url: Url,
    snapshot: Arc<dyn SnapshotSource>,
    connector: Arc<dyn PushConnector>,
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<StreamEvent>,
    session: Option<Session>,
}

impl AlertStream {
    /// Create a stream over the given producers
    pub fn new(
        config: StreamConfig,
        snapshot: Arc<dyn SnapshotSource>,
        connector: Arc<dyn PushConnector>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let push_url = config.push_url()?;
        let (events, _) = broadcast::channel(config.event_capacity);

        info!("Creating alert stream for user {}", config.username);
        Ok(Self {
            shared: Arc::new(Mutex::new(Shared {
                book: AlertBook::new(),
                notifications: NotificationCenter::new(config.notifications.clone()),
                connection: ConnectionState::Closed,
                panel: PanelState::Idle,
                generation: 0,
            })),
            config,
            push_url,
            snapshot,
            connector,
            events,
            session: None,
        })
    }

    /// Create a stream over the HTTP snapshot and WebSocket push services
    pub fn connect(config: StreamConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let snapshot = SnapshotClient::new(&config.snapshot_url, config.request_timeout())?;
        Self::new(config, Arc::new(snapshot), Arc::new(WsPushConnector))
    }

    /// Start the push subscription and the snapshot fetch
    ///
    /// No-op while a session is still active.
    pub fn open(&mut self) {
        if self.is_open() {
            debug!("Alert stream already open");
            return;
        }
        if let Some(stale) = self.session.take() {
            let _ = stale.shutdown.send(true);
        }

        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.panel = PanelState::Loading;
            shared.generation
        };

        let ctx = TaskContext {
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            generation,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let snapshot_task = tokio::spawn(run_snapshot(ctx.clone(), Arc::clone(&self.snapshot)));
        let push_task = tokio::spawn(run_push(
            ctx,
            PushSettings {
                connector: Arc::clone(&self.connector),
                url: self.push_url.clone(),
                connect_timeout: self.config.connect_timeout(),
                reconnect: self.config.reconnect.clone(),
            },
            shutdown_rx,
        ));

        self.session = Some(Session {
            shutdown: shutdown_tx,
            snapshot_task,
            push_task,
        });
        info!("Opened alert stream at {}", self.push_url);
    }

    /// Tear down the push subscription and drop any in-flight snapshot
    pub fn close(&mut self) {
        let Some(session) = self.session.take() else {
            debug!("Alert stream not open, nothing to close");
            return;
        };

        let mut pending = Vec::new();
        {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.set_connection(ConnectionState::Closed, &mut pending);
            if shared.panel == PanelState::Loading {
                shared.panel = PanelState::Idle;
            }
        }
        publish(&self.events, pending);

        let _ = session.shutdown.send(true);
        session.snapshot_task.abort();
        info!("Closed alert stream at {}", self.push_url);
    }

    /// Whether a session is running
    pub fn is_open(&self) -> bool {
        self.session.as_ref().map_or(false, Session::is_active)
    }

    /// Handle one raw push frame
    pub fn on_push(&self, raw: &str) -> MergeOutcome {
        self.merge(alert_from_frame(raw))
    }

    /// Insert or replace an alert, notifying when it is new content
    pub fn merge(&self, alert: Alert) -> MergeOutcome {
        let mut pending = Vec::new();
        let outcome = lock(&self.shared).merge(alert, &mut pending);
        publish(&self.events, pending);
        outcome
    }

    pub fn dismiss_notification(&self, id: u64) -> bool {
        lock(&self.shared).notifications.dismiss(id)
    }

    /// Remove an alert from the displayed list. Local only.
    pub fn dismiss_alert(&self, id: &AlertId) -> Option<Alert> {
        let removed = lock(&self.shared).book.dismiss(id);
        if removed.is_some() {
            debug!("Dismissed alert {}", id);
            publish(&self.events, vec![StreamEvent::AlertsChanged]);
        }
        removed
    }

    /// Current alerts, most recent first
    pub fn alerts(&self) -> Vec<Alert> {
        lock(&self.shared).book.alerts().to_vec()
    }

    /// Notifications still visible
    pub fn notifications(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut shared = lock(&self.shared);
        shared.notifications.expire(now);
        shared.notifications.visible(now)
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.shared).connection
    }

    pub fn panel(&self) -> PanelState {
        lock(&self.shared).panel.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    pub fn push_url(&self) -> &Url {
        &self.push_url
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl Drop for AlertStream {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_snapshot(ctx: TaskContext, source: Arc<dyn SnapshotSource>) {
    let result = source.fetch().await;

    let applied = ctx.with_current(|shared, events| match result {
        Ok(alerts) => {
            let count = alerts.len();
            for alert in alerts {
                shared.merge(alert, events);
            }
            shared.panel = PanelState::Ready;
            events.push(StreamEvent::SnapshotLoaded { count });
        }
        Err(e) => {
            let message = format!("Error fetching alerts: {}", e);
            warn!("{}", message);
            shared.panel = PanelState::Failed(message.clone());
            events.push(StreamEvent::SnapshotFailed(message));
        }
    });

    if !applied {
        debug!("Discarding snapshot response for a closed session");
    }
}

struct PushSettings {
    connector: Arc<dyn PushConnector>,
    url: Url,
    connect_timeout: Duration,
    reconnect: ReconnectConfig,
}

async fn run_push(ctx: TaskContext, settings: PushSettings, mut shutdown: watch::Receiver<bool>) {
    let mut attempt = 0u32;

    loop {
        if !ctx.set_connection(ConnectionState::Connecting) {
            return;
        }

        let connect = tokio::time::timeout(
            settings.connect_timeout,
            settings.connector.connect(&settings.url),
        );
        let result = tokio::select! {
            _ = shutdown.changed() => return,
            result = connect => result,
        };

        match result {
            Ok(Ok(mut connection)) => {
                attempt = 0;
                if !ctx.set_connection(ConnectionState::Open) {
                    connection.close().await;
                    return;
                }
                info!("Push subscription open at {}", settings.url);

                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            connection.close().await;
                            return;
                        }
                        frame = connection.next_frame() => match frame {
                            Some(Ok(raw)) => {
                                let alert = alert_from_frame(&raw);
                                ctx.with_current(|shared, events| {
                                    shared.merge(alert, events);
                                });
                            }
                            Some(Err(e)) => {
                                ctx.push_failed(e.to_string());
                                break;
                            }
                            None => {
                                warn!("Push service closed the subscription at {}", settings.url);
                                break;
                            }
                        }
                    }
                }
            }
            Ok(Err(e)) => ctx.push_failed(e.to_string()),
            Err(_) => ctx.push_failed(
                ClientError::Timeout(settings.connect_timeout.as_millis() as u64).to_string(),
            ),
        }

        if !ctx.set_connection(ConnectionState::Closed) {
            return;
        }

        let Some(delay) = settings.reconnect.backoff(attempt) else {
            debug!("No reconnect for {}", settings.url);
            return;
        };
        attempt += 1;
        info!("Reconnecting to {} in {:?} (attempt {})", settings.url, delay, attempt);

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
