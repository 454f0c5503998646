//! Stream state visible to the view

use alerting::Notification;

/// Push subscription state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

/// Snapshot view state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    /// No fetch started
    Idle,
    Loading,
    Ready,
    /// Fetch failed; the message is meant for display
    Failed(String),
}

/// Event broadcast to subscribers of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The alert list changed
    AlertsChanged,
    /// The snapshot fetch completed with `count` alerts
    SnapshotLoaded { count: usize },
    SnapshotFailed(String),
    /// A newly arrived pushed alert
    Notified(Notification),
    ConnectionChanged(ConnectionState),
    /// The push connection failed or timed out
    PushFailed(String),
}
