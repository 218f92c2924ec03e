//! Host scene model consumed by the semantic exporter.
//!
//! The exporter never owns the host world. It borrows nodes through the
//! [`SceneNode`] and [`SceneSource`] traits for the duration of a single
//! traversal pass. [`Entity`] and [`Scene`] are plain in-memory
//! implementations that hosts (and tests, and the demo binary) can build
//! directly or load from YAML.

pub mod camera;

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize};

pub use camera::{Camera, PerspectiveCamera};

/// Name reported for a scene that has no name of its own.
pub const UNTITLED_SCENE: &str = "UntitledScene";

/// Namespace given to capabilities created with [`Capability::builtin`].
pub const ENGINE_NAMESPACE: &str = "Engine";

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Broad category of an attached capability.
///
/// The exporter only needs to know enough about a capability to decide
/// whether it is structural, interactive, or noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Bare positional capability every node carries.
    Transform,
    /// Root of a UI hierarchy.
    Canvas,
    /// UI layout container (rows, columns, grids).
    LayoutGroup,
    /// Skinned mesh; marks the root of a character rig.
    SkinnedRig,
    /// Collision volume.
    Collider,
    /// Clickable UI control.
    Button,
    /// Animation driver.
    Animation,
    /// Physics simulation body.
    PhysicsBody,
    /// Audio source or listener.
    Audio,
    /// Mesh, sprite or text renderer.
    Renderer,
    #[default]
    Other,
}

/// A named behaviour or data unit attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Short type name, e.g. `BoxCollider` or `EnemyController`.
    pub type_name: String,
    /// Declaring namespace, e.g. `Engine.Physics` or `Game.Combat`.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub kind: CapabilityKind,
    /// Disabled controls are not interactable.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_namespace() -> String {
    ENGINE_NAMESPACE.to_string()
}

fn default_true() -> bool {
    true
}

impl Capability {
    /// A capability declared by the platform itself.
    pub fn builtin(kind: CapabilityKind, type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            namespace: ENGINE_NAMESPACE.to_string(),
            kind,
            enabled: true,
        }
    }

    /// A capability authored by the game (user logic).
    pub fn custom(namespace: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            namespace: namespace.into(),
            kind: CapabilityKind::Other,
            enabled: true,
        }
    }

    pub fn transform() -> Self {
        Self::builtin(CapabilityKind::Transform, "Transform")
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Fully qualified name, `namespace.type_name`.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}.{}", self.namespace, self.type_name)
        }
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// World-space placement of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Traits implemented by the host
// ---------------------------------------------------------------------------

/// Read-only view of one node in the host's hierarchy.
pub trait SceneNode {
    fn name(&self) -> &str;

    /// The node's own active flag (not its effective activity in the hierarchy).
    fn is_active(&self) -> bool;

    /// Layer index in `0..32`.
    fn layer(&self) -> u8;

    fn transform(&self) -> Transform;

    fn capabilities(&self) -> &[Capability];

    /// Children in the host's native order.
    fn children(&self) -> Vec<&dyn SceneNode>;

    fn has_capability(&self, kind: CapabilityKind) -> bool {
        self.capabilities().iter().any(|c| c.kind == kind)
    }
}

/// Read-only view of the host's active world.
pub trait SceneSource {
    fn scene_name(&self) -> &str;

    /// Root nodes in the host's native order.
    fn roots(&self) -> Vec<&dyn SceneNode>;

    /// Display name of a layer index. Undefined layers have an empty name.
    fn layer_name(&self, layer: u8) -> String;

    /// The camera the agent sees through, if any.
    fn camera(&self) -> Option<&dyn Camera>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// One node of an in-memory scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub layer: u8,
    #[serde(default)]
    pub transform: Transform,
    /// Always starts with the transform, even when a loaded list omits it.
    #[serde(default = "default_capabilities", deserialize_with = "capabilities_with_transform")]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub children: Vec<Entity>,
}

fn default_capabilities() -> Vec<Capability> {
    vec![Capability::transform()]
}

fn capabilities_with_transform<'de, D>(deserializer: D) -> Result<Vec<Capability>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut capabilities = Vec::<Capability>::deserialize(deserializer)?;
    if !capabilities.iter().any(|c| c.kind == CapabilityKind::Transform) {
        capabilities.insert(0, Capability::transform());
    }
    Ok(capabilities)
}

impl Entity {
    /// A new active entity on layer 0 carrying only a transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            layer: 0,
            transform: Transform::default(),
            capabilities: default_capabilities(),
            children: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_child(mut self, child: Entity) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl SceneNode for Entity {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn layer(&self) -> u8 {
        self.layer
    }

    fn transform(&self) -> Transform {
        self.transform
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn children(&self) -> Vec<&dyn SceneNode> {
        self.children.iter().map(|c| c as &dyn SceneNode).collect()
    }
}

/// Mapping from the 32 layer indices to display names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerTable {
    names: Vec<String>,
}

impl Default for LayerTable {
    fn default() -> Self {
        let mut table = Self {
            names: vec![String::new(); 32],
        };
        table.set(0, "Default");
        table.set(1, "TransparentFX");
        table.set(2, "Ignore Raycast");
        table.set(4, "Water");
        table.set(5, "UI");
        table
    }
}

impl LayerTable {
    pub fn set(&mut self, layer: u8, name: impl Into<String>) {
        let index = layer as usize;
        if index >= self.names.len() {
            self.names.resize(index + 1, String::new());
        }
        self.names[index] = name.into();
    }

    pub fn with(mut self, layer: u8, name: impl Into<String>) -> Self {
        self.set(layer, name);
        self
    }

    pub fn name(&self, layer: u8) -> &str {
        self.names
            .get(layer as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Index of the first layer with the given name.
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| u8::try_from(i).ok())
    }
}

/// An in-memory world: named scene, layer table, roots and an optional camera.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub layers: LayerTable,
    #[serde(default)]
    pub roots: Vec<Entity>,
    #[serde(default)]
    pub camera: Option<PerspectiveCamera>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_root(mut self, root: Entity) -> Self {
        self.roots.push(root);
        self
    }

    pub fn with_camera(mut self, camera: PerspectiveCamera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_layers(mut self, layers: LayerTable) -> Self {
        self.layers = layers;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read scene file '{}': {}", path.display(), e))?;
        Self::from_yaml_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse scene file '{}': {}", path.display(), e))
    }
}

impl SceneSource for Scene {
    fn scene_name(&self) -> &str {
        if self.name.is_empty() {
            UNTITLED_SCENE
        } else {
            &self.name
        }
    }

    fn roots(&self) -> Vec<&dyn SceneNode> {
        self.roots.iter().map(|r| r as &dyn SceneNode).collect()
    }

    fn layer_name(&self, layer: u8) -> String {
        self.layers.name(layer).to_string()
    }

    fn camera(&self) -> Option<&dyn Camera> {
        self.camera.as_ref().map(|c| c as &dyn Camera)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
