//! Transient notifications for newly arrived alerts

use crate::book::MergeOutcome;
use crate::model::{Alert, AlertId, AlertOrigin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Notification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long a notification stays visible (milliseconds, default: 3000)
    pub ttl_ms: u64,
    /// Maximum visible notifications; the oldest is evicted beyond this
    pub max_visible: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 3000,
            max_visible: 5,
        }
    }
}

impl NotificationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// A short-lived, user-facing notice about one pushed alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub alert_id: AlertId,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// When the notification was raised
    pub raised_at: Instant,
}

/// Decides which merges notify and tracks the visible notifications
pub struct NotificationCenter {
    config: NotificationConfig,
    /// Descriptions already notified during this stream's life
    notified: HashSet<String>,
    /// Visible notifications, oldest first
    visible: VecDeque<Notification>,
    next_id: u64,
}

impl NotificationCenter {
    pub fn new(config: NotificationConfig) -> Self {
        debug!("Creating notification center with config: {:?}", config);
        Self {
            config,
            notified: HashSet::new(),
            visible: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Whether a merge of `alert` with `outcome` is genuinely new content
    ///
    /// A pushed alert notifies once per description. Replacing a snapshot
    /// entry counts as new; updating an already notified one does not.
    pub fn should_notify(&self, alert: &Alert, outcome: &MergeOutcome) -> bool {
        alert.origin == AlertOrigin::Push
            && outcome.changed()
            && !self.notified.contains(&alert.description)
    }

    /// Raise a notification for a merged alert, if it qualifies
    pub fn on_merge(
        &mut self,
        alert: &Alert,
        outcome: &MergeOutcome,
        now: Instant,
    ) -> Option<Notification> {
        if !self.should_notify(alert, outcome) {
            return None;
        }

        self.expire(now);
        while self.config.max_visible > 0 && self.visible.len() >= self.config.max_visible {
            self.visible.pop_front();
        }

        let notification = Notification {
            id: self.next_id,
            alert_id: alert.id.clone(),
            description: alert.description.clone(),
            timestamp: alert.timestamp,
            raised_at: now,
        };
        self.next_id += 1;
        self.notified.insert(alert.description.clone());

        if self.config.max_visible > 0 {
            self.visible.push_back(notification.clone());
        }

        info!("New alert notification: {}", notification.description);
        Some(notification)
    }

    /// Dismiss a notification by id
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.visible.len();
        self.visible.retain(|n| n.id != id);
        before != self.visible.len()
    }

    /// Drop notifications older than the TTL, returning how many expired
    pub fn expire(&mut self, now: Instant) -> usize {
        let ttl = self.config.ttl();
        let before = self.visible.len();
        self.visible
            .retain(|n| now.saturating_duration_since(n.raised_at) < ttl);
        before - self.visible.len()
    }

    /// Notifications still visible at `now`
    pub fn visible(&self, now: Instant) -> Vec<Notification> {
        let ttl = self.config.ttl();
        self.visible
            .iter()
            .filter(|n| now.saturating_duration_since(n.raised_at) < ttl)
            .cloned()
            .collect()
    }

    /// Whether a description has been notified before
    pub fn was_notified(&self, description: &str) -> bool {
        self.notified.contains(description)
    }

    pub fn clear(&mut self) {
        self.notified.clear();
        self.visible.clear();
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::AlertBook;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn pushed(description: &str, hour: u32) -> Alert {
        Alert::pushed(description, at(hour), at(hour))
    }

    #[test]
    fn test_new_push_notifies() {
        let mut center = NotificationCenter::default();
        let mut book = AlertBook::new();
        let now = Instant::now();

        let alert = pushed("Flooding in sector 7", 10);
        let outcome = book.merge(alert.clone());
        let notification = center.on_merge(&alert, &outcome, now).unwrap();

        assert_eq!(notification.description, "Flooding in sector 7");
        assert_eq!(center.visible(now).len(), 1);
    }

    #[test]
    fn test_timestamp_only_update_does_not_notify() {
        let mut center = NotificationCenter::default();
        let mut book = AlertBook::new();
        let now = Instant::now();

        let first = pushed("Water shortage", 10);
        let outcome = book.merge(first.clone());
        assert!(center.on_merge(&first, &outcome, now).is_some());

        let update = pushed("Water shortage", 11);
        let outcome = book.merge(update.clone());
        assert!(matches!(outcome, MergeOutcome::Replaced { .. }));
        assert!(center.on_merge(&update, &outcome, now).is_none());
    }

    #[test]
    fn test_push_replacing_snapshot_entry_notifies() {
        let mut center = NotificationCenter::default();
        let mut book = AlertBook::new();
        let now = Instant::now();

        book.merge(Alert::new("1", "Water shortage", at(10)));

        let update = pushed("Water shortage", 11);
        let outcome = book.merge(update.clone());
        assert!(matches!(outcome, MergeOutcome::Replaced { .. }));
        let notification = center.on_merge(&update, &outcome, now).unwrap();
        assert_eq!(notification.timestamp, at(11));

        // An older push loses the merge and stays quiet
        let stale = pushed("Water shortage", 9);
        let outcome = book.merge(stale.clone());
        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert!(center.on_merge(&stale, &outcome, now).is_none());
    }

    #[test]
    fn test_snapshot_alerts_do_not_notify() {
        let center = NotificationCenter::default();
        let alert = Alert::new("1", "Curfew", at(8));
        assert!(!center.should_notify(&alert, &MergeOutcome::Inserted));
    }

    #[test]
    fn test_description_notifies_once() {
        let mut center = NotificationCenter::default();
        let now = Instant::now();

        let first = pushed("Curfew", 8);
        assert!(center.on_merge(&first, &MergeOutcome::Inserted, now).is_some());

        // Re-inserted after a local dismissal: already notified
        let again = pushed("Curfew", 9);
        assert!(center.on_merge(&again, &MergeOutcome::Inserted, now).is_none());
        assert!(center.was_notified("Curfew"));
    }

    #[test]
    fn test_expiry_and_dismiss() {
        let config = NotificationConfig {
            ttl_ms: 1000,
            ..Default::default()
        };
        let mut center = NotificationCenter::new(config);
        let now = Instant::now();

        let a = center
            .on_merge(&pushed("A", 1), &MergeOutcome::Inserted, now)
            .unwrap();
        center.on_merge(&pushed("B", 2), &MergeOutcome::Inserted, now);

        assert!(center.dismiss(a.id));
        assert!(!center.dismiss(a.id));
        assert_eq!(center.visible(now).len(), 1);

        let later = now + Duration::from_millis(1500);
        assert!(center.visible(later).is_empty());
        assert_eq!(center.expire(later), 1);
    }

    #[test]
    fn test_oldest_evicted_beyond_limit() {
        let config = NotificationConfig {
            max_visible: 2,
            ..Default::default()
        };
        let mut center = NotificationCenter::new(config);
        let now = Instant::now();

        for (i, description) in ["A", "B", "C"].iter().enumerate() {
            center.on_merge(&pushed(description, i as u32), &MergeOutcome::Inserted, now);
        }

        let visible: Vec<_> = center
            .visible(now)
            .into_iter()
            .map(|n| n.description)
            .collect();
        assert_eq!(visible, vec!["B", "C"]);
    }
}
