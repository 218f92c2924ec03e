//! Wire messages exchanged over the bridge.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::semantic::SemanticDocument;

/// Type tag of the discovery message.
pub const MPE_INIT: &str = "mpe_init";

/// Discovery message announcing the channel service port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub port: u16,
}

impl HandshakeMessage {
    pub fn init(port: u16) -> Self {
        Self {
            kind: MPE_INIT.to_string(),
            port,
        }
    }

    pub fn is_init(&self) -> bool {
        self.kind == MPE_INIT
    }
}

/// Reply sent by the handshake listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeAck {
    pub status: String,
}

impl HandshakeAck {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Outbound scene payload. The document travels as a nested JSON object,
/// not as an escaped string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMessage {
    pub scene_json: SemanticDocument,
    pub b64_image: String,
}

impl SceneMessage {
    pub fn new(document: SemanticDocument, image: &[u8]) -> Self {
        Self {
            scene_json: document,
            b64_image: BASE64.encode(image),
        }
    }

    pub fn image(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.b64_image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_handshake_wire_form() {
        let value = serde_json::to_value(HandshakeMessage::init(51234)).unwrap();
        assert_eq!(value, json!({"type": "mpe_init", "port": 51234}));

        let parsed: HandshakeMessage = serde_json::from_str(r#"{"type": "mpe_init", "port": 9000}"#).unwrap();
        assert!(parsed.is_init());
        assert_eq!(parsed.port, 9000);
    }

    #[test]
    fn test_ack_wire_form() {
        assert_eq!(serde_json::to_value(HandshakeAck::ok()).unwrap(), json!({"status": "ok"}));
    }

    #[test]
    fn test_scene_message_nests_document() {
        let message = SceneMessage::new(SemanticDocument::new("Arena"), &[0xFF, 0xD8, 0xFF]);
        let value: Value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["sceneJson"]["sceneName"], "Arena");
        assert!(value["sceneJson"].is_object());
        assert_eq!(value["b64Image"], "/9j/");
        assert_eq!(message.image().unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }
}
