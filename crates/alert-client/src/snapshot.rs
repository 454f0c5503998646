//! Snapshot Client
//!
//! Fetches the current alert list from the snapshot service.

use crate::error::ClientError;
use alerting::Alert;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default timeout for snapshot requests
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Source of the full alert list
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Alert>, ClientError>;
}

/// HTTP client for the snapshot endpoint
pub struct SnapshotClient {
    /// Endpoint returning a JSON array of alerts
    url: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl SnapshotClient {
    /// Create a new snapshot client
    ///
    /// # Arguments
    /// * `url` - Snapshot endpoint URL
    /// * `timeout` - Per-request timeout
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let url = Url::parse(url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        info!("Creating snapshot client for {}", url);
        Ok(Self {
            url,
            client,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn request_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout.as_millis() as u64)
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl SnapshotSource for SnapshotClient {
    async fn fetch(&self) -> Result<Vec<Alert>, ClientError> {
        debug!("Fetching alert snapshot from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        let alerts: Vec<Alert> =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;

        info!("Fetched {} alerts from snapshot", alerts.len());
        Ok(alerts)
    }
}
