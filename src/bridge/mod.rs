//! # Bridge
//!
//! Local duplex transport between the host and an out-of-process agent.
//!
//! ```text
//!  host process                                   agent process
//!  ────────────                                   ─────────────
//!  ChannelService (axum, 127.0.0.1:<dynamic>)
//!    └─ /sus-agent-channel ◄──── AgentPeer ─────── connects after handshake
//!  HandshakeClient ──{"type":"mpe_init","port"}──► HandshakeListener (:8765)
//!  BridgeChannel.send ──{"sceneJson","b64Image"}─► AgentPeer.next_scene
//!  BridgeChannel.on_message ◄──{"type",...}─────── AgentPeer.send_command
//! ```
//!
//! The channel layer moves raw bytes. Interpreting them is up to the
//! registered inbound handler (see `commands::CommandDispatcher`).

pub mod channel;
pub mod handshake;
pub mod messages;
pub mod peer;
pub mod service;

pub use channel::BridgeChannel;
pub use handshake::HandshakeClient;
pub use messages::{HandshakeAck, HandshakeMessage, SceneMessage, MPE_INIT};
pub use peer::{AgentPeer, HandshakeListener};
pub use service::{ChannelInfo, ChannelService, InboundHandler};

/// Bridge error types
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Handler already registered for channel '{0}'")]
    HandlerAlreadyRegistered(String),

    #[error("No connected peers on channel '{0}'")]
    NoPeers(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::Transport(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BridgeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        BridgeError::Transport(e.to_string())
    }
}
