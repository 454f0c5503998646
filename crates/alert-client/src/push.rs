//! Push Client for the Alert Subscription Service
//!
//! Receives plain-text alert frames over a WebSocket. The client never
//! sends application data.

use crate::error::ClientError;
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

/// An established push subscription
#[async_trait]
pub trait PushConnection: Send {
    /// Next text frame, or `None` once the server has closed the connection
    async fn next_frame(&mut self) -> Option<Result<String, ClientError>>;

    /// Close the connection; errors are swallowed
    async fn close(&mut self);
}

/// Opens push subscriptions
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushConnection>, ClientError>;
}

/// Build the per-user subscription URL: `<base>/<username>`
pub fn subscription_url(base: &str, username: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base)?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ClientError::InvalidUrl(format!(
            "push URL must use ws or wss, got {}",
            url.scheme()
        )));
    }

    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .push(username);
    Ok(url)
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsPushConnector;

#[async_trait]
impl PushConnector for WsPushConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushConnection>, ClientError> {
        info!("Connecting to push service at {}", url);

        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;

        debug!("Push handshake completed with status {}", response.status());
        Ok(Box::new(WsPushConnection {
            stream,
            closed: false,
        }))
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live WebSocket subscription
pub struct WsPushConnection {
    stream: WsStream,
    closed: bool,
}

#[async_trait]
impl PushConnection for WsPushConnection {
    async fn next_frame(&mut self) -> Option<Result<String, ClientError>> {
        if self.closed {
            return None;
        }

        loop {
            let message = match self.stream.next().await {
                Some(message) => message,
                None => {
                    self.closed = true;
                    return None;
                }
            };

            match message {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("Skipping non-UTF-8 binary push frame"),
                },
                // Pings are answered by tungstenite on the next read
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {
                    debug!("Control frame on push connection");
                }
                Ok(Message::Close(frame)) => {
                    info!("Push service closed the connection: {:?}", frame);
                    self.closed = true;
                    return None;
                }
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                    self.closed = true;
                    return None;
                }
                Err(e) => {
                    self.closed = true;
                    return Some(Err(ClientError::from(e)));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            debug!("Error while closing push connection: {}", e);
        }
    }
}
