//! Agent-side end of the bridge.
//!
//! [`HandshakeListener`] plays the well-known discovery endpoint and
//! [`AgentPeer`] the channel client. The host never uses these; they exist
//! so an agent process (and the end-to-end tests) can talk to the bridge.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_async, connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

use super::messages::{HandshakeAck, HandshakeMessage, SceneMessage};
use super::BridgeError;
use crate::commands::AgentCommand;

pub struct HandshakeListener {
    listener: TcpListener,
}

impl HandshakeListener {
    pub async fn bind(address: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            listener: TcpListener::bind(address).await?,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BridgeError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for one `mpe_init` message, acknowledge it and return the
    /// announced port. Connections that close without one are skipped.
    pub async fn accept_port(&self) -> Result<u16, BridgeError> {
        loop {
            let (stream, remote) = self.listener.accept().await?;
            let mut ws = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    debug!("[Handshake] Rejected connection from {}: {}", remote, e);
                    continue;
                }
            };

            while let Some(frame) = ws.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                match serde_json::from_str::<HandshakeMessage>(&text) {
                    Ok(message) if message.is_init() => {
                        let ack = serde_json::to_string(&HandshakeAck::ok())?;
                        // The host may hang up right after sending.
                        let _ = ws.send(Message::Text(ack)).await;
                        info!("[Handshake] Host channel service on port {}", message.port);
                        return Ok(message.port);
                    }
                    _ => debug!("[Handshake] Ignoring frame from {}: {}", remote, text),
                }
            }
        }
    }
}

pub struct AgentPeer {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl AgentPeer {
    /// Connect to `ws://127.0.0.1:{port}/{channel}`.
    pub async fn connect(port: u16, channel: &str) -> Result<Self, BridgeError> {
        Self::connect_url(&format!("ws://127.0.0.1:{}/{}", port, channel)).await
    }

    pub async fn connect_url(url: &str) -> Result<Self, BridgeError> {
        let (ws, _) = connect_async(url).await?;
        info!("[Peer] Connected to {}", url);
        Ok(Self { ws })
    }

    /// Next scene payload. Frames that are not scene messages are skipped.
    /// `None` once the host closes the connection.
    pub async fn next_scene(&mut self) -> Result<Option<SceneMessage>, BridgeError> {
        while let Some(frame) = self.ws.next().await {
            let data = match frame? {
                Message::Text(text) => text.into_bytes(),
                Message::Binary(data) => data,
                Message::Close(_) => return Ok(None),
                _ => continue,
            };
            match serde_json::from_slice::<SceneMessage>(&data) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => debug!("[Peer] Skipping non-scene frame: {}", e),
            }
        }
        Ok(None)
    }

    pub async fn send_command(&mut self, command: &AgentCommand) -> Result<(), BridgeError> {
        let text = serde_json::to_string(command)?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    pub async fn send_raw(&mut self, text: impl Into<String>) -> Result<(), BridgeError> {
        self.ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<(), BridgeError> {
        self.ws.close(None).await?;
        Ok(())
    }
}
