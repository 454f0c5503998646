//! De-duplicated, recency-ordered alert list

use crate::model::{Alert, AlertId};
use std::collections::HashSet;
use tracing::debug;

/// Result of merging one alert into the book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No alert with this description was present
    Inserted,
    /// An older alert with the same description was replaced
    Replaced { previous: Alert },
    /// The book already held an equal or newer alert, or the id was dismissed
    Unchanged,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, MergeOutcome::Unchanged)
    }
}

/// Alert list holding at most one entry per description,
/// sorted by timestamp descending.
#[derive(Debug, Clone, Default)]
pub struct AlertBook {
    alerts: Vec<Alert>,
    /// Ids removed locally; never re-admitted
    dismissed: HashSet<AlertId>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an alert
    pub fn merge(&mut self, alert: Alert) -> MergeOutcome {
        if self.dismissed.contains(&alert.id) {
            debug!("Ignoring dismissed alert {}", alert.id);
            return MergeOutcome::Unchanged;
        }

        let existing = self
            .alerts
            .iter()
            .position(|a| a.description == alert.description);

        let outcome = match existing {
            Some(idx) if alert.supersedes(&self.alerts[idx]) => {
                let previous = std::mem::replace(&mut self.alerts[idx], alert);
                MergeOutcome::Replaced { previous }
            }
            Some(_) => return MergeOutcome::Unchanged,
            None => {
                self.alerts.push(alert);
                MergeOutcome::Inserted
            }
        };

        self.sort();
        outcome
    }

    /// Merge a batch, returning how many merges changed the book
    pub fn merge_all<I>(&mut self, alerts: I) -> usize
    where
        I: IntoIterator<Item = Alert>,
    {
        alerts
            .into_iter()
            .map(|alert| self.merge(alert))
            .filter(MergeOutcome::changed)
            .count()
    }

    /// Remove an alert locally and remember its id
    ///
    /// Unknown ids are not remembered.
    pub fn dismiss(&mut self, id: &AlertId) -> Option<Alert> {
        let idx = self.alerts.iter().position(|a| &a.id == id)?;
        self.dismissed.insert(id.clone());
        Some(self.alerts.remove(idx))
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn get(&self, description: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.description == description)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Drop all alerts and dismissals
    pub fn clear(&mut self) {
        self.alerts.clear();
        self.dismissed.clear();
    }

    fn sort(&mut self) {
        self.alerts.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.description.cmp(&b.description))
        });
    }
}
