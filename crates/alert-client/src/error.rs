//! Alert Client Error Types

use thiserror::Error;

/// Errors talking to the snapshot or push service
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body was not a valid alert list
    #[error("Failed to decode alert list: {0}")]
    Decode(String),

    /// Push handshake failed
    #[error("Push connection failed: {0}")]
    Connect(String),

    /// Request or handshake did not finish in time
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Push connection broke after the handshake
    #[error("Push transport error: {0}")]
    Transport(String),

    /// Malformed endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
