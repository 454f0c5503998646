//! Alert Stream
//!
//! Maintains a de-duplicated, time-ordered view of alerts fed by a
//! snapshot fetch and a live push subscription, and surfaces newly
//! arrived pushed alerts as short-lived notifications.

mod config;
mod error;
mod state;
mod stream;

pub use config::{ReconnectConfig, StreamConfig};
pub use error::StreamError;
pub use state::{ConnectionState, PanelState, StreamEvent};
pub use stream::AlertStream;
