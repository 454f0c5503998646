//! Alert data model

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence used to keep synthetic ids unique within one millisecond
static SYNTHETIC_SEQ: AtomicU64 = AtomicU64::new(0);

/// Alert identifier
///
/// Snapshot alerts carry the server id (numeric or textual); pushed alerts
/// get a synthetic id derived from their receipt time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    /// Create an id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a synthetic id for an alert received at `received_at`
    pub fn synthetic(received_at: DateTime<Utc>) -> Self {
        let seq = SYNTHETIC_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("push-{}-{}", received_at.timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for AlertId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for AlertId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => AlertId::from(n),
            RawId::Text(s) => AlertId(s),
        })
    }
}

/// Alert classification tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertCategory {
    Emergency,
    Warning,
    Information,
    /// Any other free-text tag, kept verbatim
    Other(String),
}

impl AlertCategory {
    pub fn as_str(&self) -> &str {
        match self {
            AlertCategory::Emergency => "emergency",
            AlertCategory::Warning => "warning",
            AlertCategory::Information => "information",
            AlertCategory::Other(tag) => tag,
        }
    }
}

impl From<String> for AlertCategory {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "emergency" => AlertCategory::Emergency,
            "warning" => AlertCategory::Warning,
            "information" | "info" => AlertCategory::Information,
            _ => AlertCategory::Other(tag),
        }
    }
}

impl From<AlertCategory> for String {
    fn from(category: AlertCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which producer an alert came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertOrigin {
    /// Bulk snapshot fetch
    #[default]
    Snapshot,
    /// Live push frame
    Push,
}

/// A short, timestamped notice of an emergency or informational event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<AlertCategory>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub origin: AlertOrigin,
}

impl Alert {
    /// Create a snapshot-style alert
    pub fn new(
        id: impl Into<AlertId>,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category: None,
            timestamp,
            origin: AlertOrigin::Snapshot,
        }
    }

    /// Create an alert from a push frame received at `received_at`
    pub fn pushed(
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::synthetic(received_at),
            description: description.into(),
            category: None,
            timestamp,
            origin: AlertOrigin::Push,
        }
    }

    pub fn with_category(mut self, category: AlertCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Whether this alert wins a de-duplication conflict against `other`
    ///
    /// Later timestamp wins; equal timestamps fall back to the larger id.
    pub fn supersedes(&self, other: &Alert) -> bool {
        (self.timestamp, &self.id) > (other.timestamp, &other.id)
    }
}

/// Parse an alert timestamp
///
/// Accepts RFC 3339 and zone-less ISO date-times (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Text(String),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp {} out of range", ms))),
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(ts("2024-01-01T10:00:00Z"), expected);
        assert_eq!(ts("2024-01-01T12:00:00+02:00"), expected);
        assert_eq!(ts("2024-01-01T10:00:00"), expected);
        assert_eq!(ts("2024-01-01 10:00:00"), expected);
        assert_eq!(
            ts("2024-01-01T10:00:00.250"),
            expected + chrono::Duration::milliseconds(250)
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_snapshot_payload_decoding() {
        let json = r#"[
            {"id": 1, "description": "Water shortage", "category": "Emergency", "timestamp": "2024-01-01T10:00:00Z"},
            {"id": "abc", "description": "Road closed", "category": null, "timestamp": "2024-01-01T09:00:00"},
            {"id": 3, "description": "Curfew", "timestamp": 1704096000000}
        ]"#;

        let alerts: Vec<Alert> = serde_json::from_str(json).unwrap();
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].id.as_str(), "1");
        assert_eq!(alerts[0].category, Some(AlertCategory::Emergency));
        assert_eq!(alerts[0].origin, AlertOrigin::Snapshot);
        assert_eq!(alerts[1].id.as_str(), "abc");
        assert_eq!(alerts[1].category, None);
        assert_eq!(alerts[2].timestamp, ts("2024-01-01T08:00:00Z"));
    }

    #[test]
    fn test_unknown_category_kept_verbatim() {
        let category = AlertCategory::from("Medical supplies".to_string());
        assert_eq!(category, AlertCategory::Other("Medical supplies".to_string()));
        assert_eq!(category.to_string(), "Medical supplies");
    }

    #[test]
    fn test_synthetic_ids_are_unique() {
        let now = ts("2024-01-01T10:00:00Z");
        let a = AlertId::synthetic(now);
        let b = AlertId::synthetic(now);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("push-1704103200000-"));
    }

    #[test]
    fn test_supersedes() {
        let older = Alert::new("1", "Fire", ts("2024-01-01T10:00:00Z"));
        let newer = Alert::new("2", "Fire", ts("2024-01-01T11:00:00Z"));
        assert!(newer.supersedes(&older));
        assert!(!older.supersedes(&newer));
        assert!(!older.supersedes(&older.clone()));
    }
}
