//! Alert Service Clients
//!
//! This crate provides the two producers feeding the alert stream: an HTTP
//! client for the snapshot endpoint and a WebSocket client for the per-user
//! push subscription. Both sit behind traits so the stream can be driven by
//! in-memory implementations in tests.

mod error;
mod push;
mod snapshot;

pub use error::ClientError;
pub use push::{subscription_url, PushConnection, PushConnector, WsPushConnection, WsPushConnector};
pub use snapshot::{SnapshotClient, SnapshotSource, DEFAULT_REQUEST_TIMEOUT_MS};
