//! Text rendering for the alert panel and notifications

use alert_stream::PanelState;
use alerting::{Alert, Notification};
use serde_json::json;

pub const IDLE_TEXT: &str = "Alert stream closed.";
pub const LOADING_TEXT: &str = "Loading alerts...";
pub const EMPTY_TEXT: &str = "No alerts found.";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the alert panel as lines of text
///
/// A status line leads unless the snapshot is ready; merged alerts are
/// always listed.
pub fn render_panel(panel: &PanelState, alerts: &[Alert]) -> Vec<String> {
    let status = match panel {
        PanelState::Idle => Some(IDLE_TEXT.to_string()),
        PanelState::Loading => Some(LOADING_TEXT.to_string()),
        PanelState::Failed(message) => Some(message.clone()),
        PanelState::Ready if alerts.is_empty() => Some(EMPTY_TEXT.to_string()),
        PanelState::Ready => None,
    };

    status
        .into_iter()
        .chain(alerts.iter().map(render_alert))
        .collect()
}

/// One alert line: `[id] time  (category) description`
pub fn render_alert(alert: &Alert) -> String {
    let time = alert.timestamp.format(TIMESTAMP_FORMAT);
    match &alert.category {
        Some(category) => format!(
            "[{}] {}  ({}) {}",
            alert.id,
            time,
            category.as_str(),
            alert.description
        ),
        None => format!("[{}] {}  {}", alert.id, time, alert.description),
    }
}

pub fn render_notification(notification: &Notification) -> String {
    format!(
        "*** New Alert #{}: {} at {} ***",
        notification.id,
        notification.description,
        notification.timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// JSON form of the alert list for `--json` output
pub fn alerts_json(alerts: &[Alert]) -> String {
    json!({ "alerts": alerts }).to_string()
}
