//! Discovery of clickable UI buttons in the host scene.
//!
//! A button is interactable when its node is active in the hierarchy, it
//! carries an enabled `Button` capability and it sits on or below a node
//! with an enabled `Canvas`.

use log::debug;

use crate::scene::{CapabilityKind, SceneNode, SceneSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonHit {
    pub name: String,
    /// Slash-separated path from the root.
    pub path: String,
    /// Ancestor names, root first.
    pub ancestors: Vec<String>,
}

impl ButtonHit {
    pub fn has_ancestor(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.ancestors.iter().any(|a| a.to_lowercase() == wanted)
    }
}

pub struct ButtonFinder;

impl ButtonFinder {
    /// Every interactable button, in hierarchy order.
    pub fn interactable_buttons(source: &dyn SceneSource) -> Vec<ButtonHit> {
        let mut hits = Vec::new();
        let mut ancestors = Vec::new();
        for root in source.roots() {
            collect(root, false, &mut ancestors, &mut hits);
        }
        hits
    }

    /// Comma-separated button names, or `"None"`.
    pub fn button_names(source: &dyn SceneSource) -> String {
        let buttons = Self::interactable_buttons(source);
        let names = if buttons.is_empty() {
            "None".to_string()
        } else {
            buttons.iter().map(|b| b.name.as_str()).collect::<Vec<_>>().join(", ")
        };
        debug!("[Agent] Found {} interactable buttons: {}", buttons.len(), names);
        names
    }

    /// First interactable button whose name matches case-insensitively and,
    /// if given, that has an ancestor called `ancestor`.
    pub fn find(source: &dyn SceneSource, name: &str, ancestor: Option<&str>) -> Option<ButtonHit> {
        let wanted = name.to_lowercase();
        Self::interactable_buttons(source)
            .into_iter()
            .find(|b| b.name.to_lowercase() == wanted && ancestor.map_or(true, |a| b.has_ancestor(a)))
    }
}

fn collect(node: &dyn SceneNode, under_canvas: bool, ancestors: &mut Vec<String>, hits: &mut Vec<ButtonHit>) {
    if !node.is_active() {
        return;
    }
    let caps = node.capabilities();
    let under_canvas = under_canvas || caps.iter().any(|c| c.kind == CapabilityKind::Canvas && c.enabled);

    if under_canvas && caps.iter().any(|c| c.kind == CapabilityKind::Button && c.enabled) {
        let mut path = ancestors.join("/");
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(node.name());
        hits.push(ButtonHit {
            name: node.name().to_string(),
            path,
            ancestors: ancestors.clone(),
        });
    }

    ancestors.push(node.name().to_string());
    for child in node.children() {
        collect(child, under_canvas, ancestors, hits);
    }
    ancestors.pop();
}
