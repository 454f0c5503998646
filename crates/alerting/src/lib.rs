//! Alerting Domain
//!
//! Alert model, push frame parsing, de-duplicated alert book, and
//! transient notifications for newly arrived alerts.

mod book;
mod model;
mod notify;
mod parse;

pub use book::{AlertBook, MergeOutcome};
pub use model::{parse_timestamp, Alert, AlertCategory, AlertId, AlertOrigin};
pub use notify::{Notification, NotificationCenter, NotificationConfig};
pub use parse::{parse_push_frame, PushFrame, FRAME_DELIMITER, FRAME_PREFIX};
