//! Named logical channel over the [`ChannelService`].

use std::sync::Arc;

use bytes::Bytes;

use super::messages::SceneMessage;
use super::service::{ChannelService, InboundHandler};
use super::BridgeError;
use crate::agent::{PayloadSink, SendReport};
use crate::semantic::SemanticDocument;

pub struct BridgeChannel {
    service: Arc<ChannelService>,
    name: String,
}

impl BridgeChannel {
    /// Make sure the service listens on `bind`, then open channel `name`.
    pub async fn open(service: Arc<ChannelService>, bind: &str, name: &str) -> Result<Self, BridgeError> {
        service.ensure_running(bind).await?;
        service.get_or_create_channel(name);
        Ok(Self {
            service,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &Arc<ChannelService> {
        &self.service
    }

    pub fn port(&self) -> Option<u16> {
        self.service.port()
    }

    /// Register the single inbound callback for this channel.
    pub fn on_message(&self, handler: impl Fn(u32, Bytes) + Send + Sync + 'static) -> Result<(), BridgeError> {
        let handler: InboundHandler = Arc::new(handler);
        self.service.set_handler(&self.name, handler)
    }

    /// Broadcast raw bytes to every peer on channels with this name.
    /// Returns the number of peers reached.
    pub fn send(&self, payload: Bytes) -> Result<usize, BridgeError> {
        let targets: Vec<u32> = self
            .service
            .channel_list()
            .into_iter()
            .filter(|info| info.name == self.name)
            .map(|info| info.id)
            .collect();
        if targets.is_empty() {
            return Err(BridgeError::ChannelNotFound(self.name.clone()));
        }

        let mut reached = 0;
        for id in targets {
            reached += self.service.broadcast(id, payload.clone())?;
        }
        Ok(reached)
    }
}

impl PayloadSink for BridgeChannel {
    fn send_scene(&self, document: &SemanticDocument, image: &[u8]) -> Result<SendReport, BridgeError> {
        let scene_bytes = serde_json::to_vec_pretty(document)?.len();
        let message = SceneMessage::new(document.clone(), image);
        let payload = serde_json::to_vec(&message)?;
        let peers = self.send(Bytes::from(payload))?;
        Ok(SendReport {
            scene_bytes,
            image_bytes: image.len(),
            peers,
        })
    }
}
