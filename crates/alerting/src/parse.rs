//! Push frame parsing
//!
//! Frames are expected as `New Alert: <description> at <timestamp>`.
//! Anything else is kept verbatim and stamped with the receipt time.

use crate::model::{parse_timestamp, Alert};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Prefix the push service puts in front of every alert
pub const FRAME_PREFIX: &str = "New Alert: ";

/// Separator between description and timestamp
pub const FRAME_DELIMITER: &str = " at ";

/// Parsed push frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFrame {
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// False when the fallback path was taken
    pub well_formed: bool,
}

impl PushFrame {
    /// Convert into an alert with a synthetic id
    pub fn into_alert(self, received_at: DateTime<Utc>) -> Alert {
        Alert::pushed(self.description, self.timestamp, received_at)
    }
}

/// Parse a raw push frame. Never fails.
pub fn parse_push_frame(raw: &str, received_at: DateTime<Utc>) -> PushFrame {
    match split_frame(raw) {
        Some((description, timestamp)) => PushFrame {
            description,
            timestamp,
            well_formed: true,
        },
        None => {
            debug!("Push frame not in expected shape, keeping verbatim: {:?}", raw);
            PushFrame {
                description: raw.trim().to_string(),
                timestamp: received_at,
                well_formed: false,
            }
        }
    }
}

fn split_frame(raw: &str) -> Option<(String, DateTime<Utc>)> {
    // Last delimiter, so descriptions may themselves contain " at "
    let (head, tail) = raw.trim().rsplit_once(FRAME_DELIMITER)?;
    let description = head.strip_prefix(FRAME_PREFIX)?.trim();
    if description.is_empty() {
        return None;
    }
    let timestamp = parse_timestamp(tail)?;
    Some((description.to_string(), timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_well_formed_frame() {
        let frame = parse_push_frame(
            "New Alert: Flooding in sector 7 at 2024-01-01T00:00:00Z",
            received(),
        );
        assert!(frame.well_formed);
        assert_eq!(frame.description, "Flooding in sector 7");
        assert_eq!(
            frame.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_malformed_frame_falls_back() {
        let frame = parse_push_frame("malformed garbage", received());
        assert!(!frame.well_formed);
        assert_eq!(frame.description, "malformed garbage");
        assert_eq!(frame.timestamp, received());
    }

    #[test]
    fn test_description_containing_delimiter() {
        let frame = parse_push_frame(
            "New Alert: Shelling at the north bridge at 2024-01-01T08:15:00Z",
            received(),
        );
        assert!(frame.well_formed);
        assert_eq!(frame.description, "Shelling at the north bridge");
    }

    #[test]
    fn test_unparseable_timestamp_is_verbatim() {
        let raw = "New Alert: Convoy delayed at the checkpoint";
        let frame = parse_push_frame(raw, received());
        assert!(!frame.well_formed);
        assert_eq!(frame.description, raw);
        assert_eq!(frame.timestamp, received());
    }

    #[test]
    fn test_missing_prefix_is_verbatim() {
        let raw = "Power outage at 2024-01-01T00:00:00Z";
        let frame = parse_push_frame(raw, received());
        assert!(!frame.well_formed);
        assert_eq!(frame.description, raw);
    }

    #[test]
    fn test_empty_description_is_verbatim() {
        let raw = "New Alert:  at 2024-01-01T00:00:00Z";
        let frame = parse_push_frame(raw, received());
        assert!(!frame.well_formed);
        assert_eq!(frame.description, raw);
    }

    #[test]
    fn test_into_alert_is_push_origin() {
        let alert = parse_push_frame("malformed garbage", received()).into_alert(received());
        assert_eq!(alert.origin, crate::AlertOrigin::Push);
        assert!(alert.id.as_str().starts_with("push-"));
    }
}
