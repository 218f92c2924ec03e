//! Wire document handed to the agent.
//!
//! Optional fields are *absent* from the serialized form when they do not
//! apply. Numeric rounding happens when values are constructed, so two
//! documents built from the same scene compare equal and serialize to the
//! same bytes.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Explanatory text attached to every document.
pub const SCENE_CONTEXT: &str = "Each entry in the JSON represents a single interactable entity. \
To interact with a unit or obstacle, use the viewportPos of its root node.";

/// Decimal places kept for world-space components.
pub const WORLD_DECIMALS: i32 = 3;

/// Decimal places kept for normalized viewport components.
pub const VIEWPORT_DECIMALS: i32 = 5;

/// Round half to even at the given number of decimal places.
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f64.powi(decimals);
    let rounded = ((value as f64 * factor).round_ties_even() / factor) as f32;
    // Keep `-0.0` out of the wire form.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// A world-space vector rounded to [`WORLD_DECIMALS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for SimpleVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: round_to(v.x, WORLD_DECIMALS),
            y: round_to(v.y, WORLD_DECIMALS),
            z: round_to(v.z, WORLD_DECIMALS),
        }
    }
}

/// A normalized viewport position rounded to [`VIEWPORT_DECIMALS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleVec2 {
    pub x: f32,
    pub y: f32,
}

impl SimpleVec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: round_to(x, VIEWPORT_DECIMALS),
            y: round_to(y, VIEWPORT_DECIMALS),
        }
    }
}

impl From<Vec2> for SimpleVec2 {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// One emitted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticNode {
    pub name: String,
    /// Slash-separated path from the root, e.g. `Obstacles/Wall`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<SimpleVec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<SimpleVec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<SimpleVec3>,
    /// Top-left origin, `(0, 0)` to `(1, 1)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_pos: Option<SimpleVec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
}

impl SemanticNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            layer: None,
            position: None,
            rotation: None,
            scale: None,
            viewport_pos: None,
            components: None,
        }
    }
}

/// The snapshot sent to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticDocument {
    pub scene_name: String,
    pub scene_context: String,
    pub entities: Vec<SemanticNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_counts: Option<BTreeMap<String, u32>>,
}

impl SemanticDocument {
    pub fn new(scene_name: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
            scene_context: SCENE_CONTEXT.to_string(),
            entities: Vec::new(),
            layer_counts: None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn entity(&self, name: &str) -> Option<&SemanticNode> {
        self.entities.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_round_to_three_and_five_places() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(-0.0004, 3), 0.0);
        assert!(round_to(-0.0004, 3).is_sign_positive());
        assert_eq!(round_to(0.123456789, 5), 0.12346);
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_to(0.5, 0), 0.0);
        assert_eq!(round_to(1.5, 0), 2.0);
        assert_eq!(round_to(2.5, 0), 2.0);
    }

    #[test]
    fn test_vectors_round_on_construction() {
        let v: SimpleVec3 = Vec3::new(1.00049, 2.71828, -3.14159).into();
        assert_eq!(v, SimpleVec3 { x: 1.0, y: 2.718, z: -3.142 });
        let p = SimpleVec2::new(0.333333, 0.666666);
        assert_eq!(p, SimpleVec2 { x: 0.33333, y: 0.66667 });
    }

    #[test]
    fn test_optional_fields_are_absent() {
        let node = SemanticNode::new("Enemy", "Root/Enemy");
        let json: Value = serde_json::to_value(&node).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["name"], "Enemy");
        assert_eq!(obj["path"], "Root/Enemy");
    }

    #[test]
    fn test_camel_case_field_names() {
        let mut node = SemanticNode::new("Enemy", "Root/Enemy");
        node.viewport_pos = Some(SimpleVec2::new(0.5, 0.25));
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"viewportPos\":{\"x\":0.5,\"y\":0.25}"));
    }

    #[test]
    fn test_layer_counts_omitted_unless_requested() {
        let doc = SemanticDocument::new("Arena");
        let json: Value = serde_json::to_value(&doc).unwrap();
        assert!(json.get("layerCounts").is_none());
        assert_eq!(json["sceneName"], "Arena");
        assert_eq!(json["sceneContext"], SCENE_CONTEXT);
        assert!(json["entities"].as_array().unwrap().is_empty());

        let mut with_stats = SemanticDocument::new("Arena");
        with_stats.layer_counts = Some(BTreeMap::new());
        let json: Value = serde_json::to_value(&with_stats).unwrap();
        assert!(json["layerCounts"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_document_parses_back() {
        let mut doc = SemanticDocument::new("Arena");
        doc.entities.push(SemanticNode::new("Enemy", "Root/Enemy"));
        let parsed: SemanticDocument = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(parsed, doc);
        assert!(parsed.entity("Enemy").is_some());
    }
}
