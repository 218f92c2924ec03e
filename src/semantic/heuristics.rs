//! Heuristic filters that keep the exported scene small and dense.
//!
//! Three questions are asked about every node:
//!
//! - **Folder?** Pure grouping nodes do not consume depth budget.
//! - **Gameplay relevant?** Only these are emitted as entities.
//! - **Functional capability?** Only these capability names are reported.
//!
//! The denylists are plain data so a host can tune them, but the defaults
//! are what agents are prompted against.

use crate::scene::{Capability, CapabilityKind, SceneNode};

/// Substrings (case-insensitive) marking UI text and camera-rig internals.
/// Applied to node names and to capability full names.
pub const IGNORED_TYPES: &[&str] = &["cm", "tmp", "text"];

/// Substrings (case-insensitive) marking systems and cosmetic helpers.
/// Applied to node names only.
pub const IGNORED_NAMES: &[&str] = &[
    "manager",
    "loader",
    "camera",
    "target",
    "system",
    "volume",
    "cursor",
    "display",
    "billboard",
];

/// Namespaces declared by the platform itself.
pub const BUILTIN_NAMESPACES: &[&str] = &["Engine", "Editor"];

/// Stateless classifier over nodes and their capabilities.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    ignored_types: Vec<String>,
    ignored_names: Vec<String>,
    builtin_namespaces: Vec<String>,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self {
            ignored_types: IGNORED_TYPES.iter().map(|s| s.to_string()).collect(),
            ignored_names: IGNORED_NAMES.iter().map(|s| s.to_string()).collect(),
            builtin_namespaces: BUILTIN_NAMESPACES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the platform namespace list.
    pub fn with_builtin_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtin_namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Add an extra node-name substring to ignore.
    pub fn ignoring_name(mut self, fragment: impl Into<String>) -> Self {
        self.ignored_names.push(fragment.into().to_lowercase());
        self
    }

    /// True when the node only groups children.
    ///
    /// That is the case when its sole capability is the bare transform, or
    /// when it carries a UI canvas or layout container.
    pub fn is_folder(&self, node: &dyn SceneNode) -> bool {
        let caps = node.capabilities();
        if caps.len() == 1 && caps[0].kind == CapabilityKind::Transform {
            return true;
        }
        caps.iter()
            .any(|c| matches!(c.kind, CapabilityKind::Canvas | CapabilityKind::LayoutGroup))
    }

    /// True when the node is worth emitting to the agent.
    pub fn is_gameplay_relevant(&self, node: &dyn SceneNode) -> bool {
        let name = node.name().to_lowercase();
        if contains_any(&name, &self.ignored_types) || contains_any(&name, &self.ignored_names) {
            return false;
        }

        node.capabilities()
            .iter()
            .any(|c| !self.is_builtin(c) || is_interactive(c))
    }

    /// True when the capability's name tells the agent something useful.
    pub fn is_functional_capability(&self, capability: &Capability) -> bool {
        if matches!(
            capability.kind,
            CapabilityKind::Transform
                | CapabilityKind::Animation
                | CapabilityKind::PhysicsBody
                | CapabilityKind::Audio
        ) {
            return false;
        }

        let full_name = capability.full_name();
        if full_name.contains("Animation") {
            return false;
        }
        if contains_any(&full_name.to_lowercase(), &self.ignored_types) {
            return false;
        }

        !self.is_builtin(capability) || is_interactive(capability)
    }

    /// True when the capability is declared in a platform namespace.
    pub fn is_builtin(&self, capability: &Capability) -> bool {
        let namespace = capability.namespace.as_str();
        self.builtin_namespaces.iter().any(|builtin| {
            namespace == builtin
                || namespace
                    .strip_prefix(builtin.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

fn is_interactive(capability: &Capability) -> bool {
    matches!(capability.kind, CapabilityKind::Collider | CapabilityKind::Button)
}

fn contains_any(haystack: &str, fragments: &[String]) -> bool {
    fragments.iter().any(|f| haystack.contains(f.as_str()))
}
