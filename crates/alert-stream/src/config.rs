//! Alert stream configuration

use crate::error::StreamError;
use alert_client::{subscription_url, DEFAULT_REQUEST_TIMEOUT_MS};
use alerting::NotificationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Configuration for one alert stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Snapshot endpoint returning the current alert list
    pub snapshot_url: String,
    /// Push service base; the username is appended as a path segment
    pub push_base_url: String,
    /// Subscribing user. Required, there is no placeholder default.
    pub username: String,
    /// Push handshake timeout (milliseconds)
    pub connect_timeout_ms: u64,
    /// Snapshot request timeout (milliseconds)
    pub request_timeout_ms: u64,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
    pub notifications: NotificationConfig,
    pub reconnect: ReconnectConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            snapshot_url: "http://localhost:8070/api/alerts".to_string(),
            push_base_url: "ws://localhost:8070/subscribe".to_string(),
            username: String::new(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            event_capacity: 64,
            notifications: NotificationConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Default endpoints for the given user
    pub fn for_user(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Per-user push subscription URL
    pub fn push_url(&self) -> Result<Url, StreamError> {
        Ok(subscription_url(&self.push_base_url, &self.username)?)
    }

    /// Check the configuration before opening a stream
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.username.trim().is_empty() {
            return Err(StreamError::InvalidConfig(
                "username is required for the push subscription".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(StreamError::InvalidConfig(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(StreamError::InvalidConfig(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        Url::parse(&self.snapshot_url)
            .map_err(|e| StreamError::InvalidConfig(format!("snapshot_url: {}", e)))?;
        self.push_url()?;
        Ok(())
    }
}

/// Reconnect policy for a dropped push connection
///
/// Disabled by default: a dropped connection stays closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Attempts after a drop before giving up
    pub max_attempts: u32,
    /// First backoff delay (milliseconds); doubles per attempt
    pub initial_backoff_ms: u64,
    /// Backoff cap (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (zero-based), if allowed
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if !self.enabled || attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Some(Duration::from_millis(delay))
    }
}
