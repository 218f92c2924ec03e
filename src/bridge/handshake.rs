//! One-shot discovery handshake.
//!
//! The agent server listens on a fixed loopback address. At startup the
//! host connects there once and announces the dynamically assigned port of
//! its channel service. Failure is not fatal: the bridge keeps running and
//! can be discovered again by a later handshake.

use std::time::Duration;

use futures::SinkExt;
use log::{info, warn};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::messages::HandshakeMessage;
use super::BridgeError;

/// Well-known address of the agent server.
pub const DEFAULT_HANDSHAKE_URL: &str = "ws://127.0.0.1:8765";

#[derive(Debug, Clone)]
pub struct HandshakeClient {
    url: String,
    timeout: Duration,
}

impl Default for HandshakeClient {
    fn default() -> Self {
        Self::new(DEFAULT_HANDSHAKE_URL, Duration::from_millis(5000))
    }
}

impl HandshakeClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect, send `{"type":"mpe_init","port":port}` and close.
    pub async fn send(&self, port: u16) -> Result<(), BridgeError> {
        let text = serde_json::to_string(&HandshakeMessage::init(port))?;
        let exchange = async {
            let (mut ws, _) = connect_async(self.url.as_str()).await?;
            ws.send(Message::Text(text)).await?;
            // Best effort: the server may already have hung up.
            let _ = ws.close(None).await;
            Ok::<_, BridgeError>(())
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| BridgeError::Timeout(self.timeout.as_millis() as u64))?
    }

    /// Like [`send`](Self::send), but logs the outcome instead of returning it.
    pub async fn announce(&self, port: u16) -> bool {
        match self.send(port).await {
            Ok(()) => {
                info!("[Handshake] Sent dynamic port {} to agent server at {}", port, self.url);
                true
            }
            Err(e) => {
                warn!("[Handshake] Agent server handshake failed (is the server running?): {}", e);
                false
            }
        }
    }
}
