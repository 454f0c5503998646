//! Alert Stream Error Types

use alert_client::ClientError;
use thiserror::Error;

/// Errors creating an alert stream
///
/// Runtime failures (snapshot errors, dropped connections) are reported
/// through the stream's panel state and events instead.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Configuration rejected by validation
    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),

    /// Client construction failed
    #[error(transparent)]
    Client(#[from] ClientError),
}
