//! # semantic-scene
//!
//! Exposes a running game scene to an external AI agent.
//!
//! Each agent cycle captures the current frame, walks the scene graph into a
//! compact semantic document and ships both over a local websocket channel.
//! The agent answers with tool invocations (screen clicks, UI button presses)
//! that are executed back on the host's own tick.
//!
//! - [`semantic`]: scene graph to JSON document
//! - [`capture`]: encoded frame capture
//! - [`agent`]: the capture / send / await loop
//! - [`bridge`]: websocket channel service and handshake
//! - [`commands`]: decoding and executing agent replies

pub mod agent;
pub mod bridge;
pub mod capture;
pub mod commands;
pub mod scene;
pub mod semantic;
pub mod utilities;

pub use agent::{AgentLoopController, AgentRuntime, LoopSettings, LoopState};
pub use bridge::{BridgeChannel, BridgeError, ChannelService};
pub use commands::{AgentCommand, CommandDispatcher, HostEffectors};
pub use scene::{SceneNode, SceneSource};
pub use semantic::{ExportSettings, SemanticDocument, SemanticDocumentBuilder};
pub use utilities::config::BridgeConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
