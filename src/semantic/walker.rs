//! Depth- and visibility-bounded traversal of the host hierarchy.
//!
//! The walk is depth-first in the host's native child order, so the order
//! of `entities` is stable for a given scene. Per node, in order:
//!
//! 1. inactive nodes are pruned with their subtree,
//! 2. nodes on an excluded layer are pruned with their subtree,
//! 3. nodes deeper than `max_depth` are pruned with their subtree,
//! 4. character rigs are pruned with their subtree,
//! 5. the node is counted in the layer statistics,
//! 6. its viewport position is computed,
//! 7. on-screen nodes of the [`GRID_TILES_LAYER`] are dropped,
//! 8. its path is built,
//! 9. gameplay-relevant nodes are emitted,
//! 10. children are queued, at the same depth when the node is a folder.

use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec3;

use crate::scene::{Camera, CapabilityKind, SceneNode, SceneSource, Transform};
use crate::semantic::document::{SemanticNode, SimpleVec2};
use crate::semantic::heuristics::HeuristicClassifier;
use crate::semantic::settings::ExportSettings;

/// Layer whose *visible* members are dropped.
///
/// Tile grids can hold thousands of nodes, most of them on screen at once.
/// Only the off-screen remainder is exported.
pub const GRID_TILES_LAYER: &str = "Grid Tiles";

/// Per-component tolerance when comparing a scale with identity.
pub const SCALE_EPSILON: f32 = 1e-5;

/// Result of one traversal pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkOutput {
    pub entities: Vec<SemanticNode>,
    /// Present only when layer statistics were requested.
    pub layer_counts: Option<BTreeMap<String, u32>>,
}

struct Frame<'s> {
    node: &'s dyn SceneNode,
    parent_path: Option<Rc<str>>,
    depth: u32,
}

/// Walks a [`SceneSource`] under a fixed set of [`ExportSettings`].
#[derive(Debug, Clone, Default)]
pub struct SceneGraphWalker {
    settings: ExportSettings,
    classifier: HeuristicClassifier,
}

impl SceneGraphWalker {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            classifier: HeuristicClassifier::default(),
        }
    }

    pub fn with_classifier(settings: ExportSettings, classifier: HeuristicClassifier) -> Self {
        Self {
            settings,
            classifier,
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn walk(&self, source: &dyn SceneSource) -> WalkOutput {
        let camera = source.camera();
        let mut out = WalkOutput {
            entities: Vec::new(),
            layer_counts: self.settings.include_layer_stats.then(BTreeMap::new),
        };

        let mut stack: Vec<Frame<'_>> = source
            .roots()
            .into_iter()
            .rev()
            .map(|node| Frame {
                node,
                parent_path: None,
                depth: 0,
            })
            .collect();

        while let Some(Frame {
            node,
            parent_path,
            depth,
        }) = stack.pop()
        {
            if !node.is_active() {
                continue;
            }
            let layer = node.layer();
            if self.settings.is_layer_excluded(layer) {
                continue;
            }
            if depth > self.settings.max_depth {
                continue;
            }
            if node.has_capability(CapabilityKind::SkinnedRig) {
                continue;
            }

            let layer_name = source.layer_name(layer);
            if let Some(counts) = out.layer_counts.as_mut() {
                *counts.entry(layer_name.clone()).or_insert(0) += 1;
            }

            let transform = node.transform();
            let viewport_pos = camera.and_then(|c| viewport_position(c, transform.position));
            if layer_name == GRID_TILES_LAYER && viewport_pos.is_some() {
                continue;
            }

            let path: Rc<str> = match parent_path.as_deref() {
                Some(parent) if !parent.is_empty() => format!("{}/{}", parent, node.name()).into(),
                _ => node.name().into(),
            };

            if self.classifier.is_gameplay_relevant(node) {
                out.entities
                    .push(self.semantic_node(node, &path, layer_name, transform, viewport_pos));
            }

            let child_depth = if self.classifier.is_folder(node) {
                depth
            } else {
                depth.saturating_add(1)
            };
            for child in node.children().into_iter().rev() {
                stack.push(Frame {
                    node: child,
                    parent_path: Some(Rc::clone(&path)),
                    depth: child_depth,
                });
            }
        }

        out
    }

    fn semantic_node(
        &self,
        node: &dyn SceneNode,
        path: &str,
        layer_name: String,
        transform: Transform,
        viewport_pos: Option<SimpleVec2>,
    ) -> SemanticNode {
        let mut entry = SemanticNode::new(node.name(), path);
        entry.viewport_pos = viewport_pos;

        if self.settings.include_transforms {
            entry.layer = Some(layer_name);
            entry.position = Some(transform.position.into());
            entry.rotation = Some(transform.rotation.into());
            if !transform.scale.abs_diff_eq(Vec3::ONE, SCALE_EPSILON) {
                entry.scale = Some(transform.scale.into());
            }
        }

        if self.settings.include_components {
            let mut names: Vec<String> = Vec::new();
            for capability in node.capabilities() {
                if self.classifier.is_functional_capability(capability)
                    && !names.contains(&capability.type_name)
                {
                    names.push(capability.type_name.clone());
                }
            }
            if !names.is_empty() {
                entry.components = Some(names);
            }
        }

        entry
    }
}

/// Top-left-origin viewport position of a world point, if it is on screen.
pub fn viewport_position(camera: &dyn Camera, world: Vec3) -> Option<SimpleVec2> {
    let p = camera.world_to_viewport(world);
    let on_screen = p.z > 0.0 && (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y);
    on_screen.then(|| SimpleVec2::new(p.x, 1.0 - p.y))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scene::{Capability, Entity, LayerTable, Scene};

    /// Camera whose "projection" is the identity: a node's position already
    /// holds its viewport x/y and depth.
    pub(crate) struct FlatCamera;

    impl Camera for FlatCamera {
        fn world_to_viewport(&self, world: Vec3) -> Vec3 {
            world
        }
    }

    pub(crate) struct TestWorld {
        pub scene: Scene,
        pub camera: Option<FlatCamera>,
    }

    impl TestWorld {
        pub fn new(scene: Scene) -> Self {
            Self {
                scene,
                camera: Some(FlatCamera),
            }
        }

        pub fn without_camera(scene: Scene) -> Self {
            Self {
                scene,
                camera: None,
            }
        }
    }

    impl SceneSource for TestWorld {
        fn scene_name(&self) -> &str {
            self.scene.scene_name()
        }

        fn roots(&self) -> Vec<&dyn SceneNode> {
            self.scene.roots()
        }

        fn layer_name(&self, layer: u8) -> String {
            self.scene.layer_name(layer)
        }

        fn camera(&self) -> Option<&dyn Camera> {
            self.camera.as_ref().map(|c| c as &dyn Camera)
        }
    }

    fn logic(name: &str) -> Entity {
        Entity::new(name).with_capability(Capability::custom("Game", format!("{}Logic", name)))
    }

    fn names(out: &WalkOutput) -> Vec<&str> {
        out.entities.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_depth_bound_counts_non_folder_ancestors() {
        let root = logic("Root").with_child(logic("A").with_child(logic("B").with_child(logic("C"))));
        let world = TestWorld::without_camera(Scene::new("S").with_root(root));

        let out = SceneGraphWalker::new(ExportSettings::default().with_max_depth(1)).walk(&world);
        assert_eq!(names(&out), vec!["Root", "A"]);

        let out = SceneGraphWalker::new(ExportSettings::default().with_max_depth(0)).walk(&world);
        assert_eq!(names(&out), vec!["Root"]);
    }

    #[test]
    fn test_folders_are_transparent_to_depth() {
        let chain = Entity::new("F1")
            .with_child(Entity::new("F2").with_child(Entity::new("F3").with_child(logic("Leaf"))));
        let world = TestWorld::without_camera(Scene::new("S").with_root(chain));

        let out = SceneGraphWalker::new(ExportSettings::default().with_max_depth(1)).walk(&world);
        assert_eq!(names(&out), vec!["Leaf"]);
        assert_eq!(out.entities[0].path, "F1/F2/F3/Leaf");
    }

    #[test]
    fn test_inactive_subtree_is_pruned() {
        let root = Entity::new("Root")
            .with_child(logic("Off").inactive().with_child(logic("Inner")))
            .with_child(logic("On"));
        let world = TestWorld::without_camera(Scene::new("S").with_root(root));
        let out = SceneGraphWalker::new(ExportSettings::editor_authoring()).walk(&world);
        assert_eq!(names(&out), vec!["On"]);
    }

    #[test]
    fn test_excluded_layer_subtree_is_pruned() {
        let root = Entity::new("Root")
            .with_child(logic("Ui").with_layer(5).with_child(logic("UiChild")))
            .with_child(logic("World"));
        let world = TestWorld::without_camera(Scene::new("S").with_root(root));
        let settings = ExportSettings::editor_authoring().excluding_layer(5);
        let out = SceneGraphWalker::new(settings).walk(&world);
        assert_eq!(names(&out), vec!["World"]);
        assert!(!out.layer_counts.unwrap().contains_key("UI"));
    }

    #[test]
    fn test_character_rig_is_pruned() {
        let hero = logic("Hero")
            .with_capability(Capability::builtin(CapabilityKind::SkinnedRig, "SkinnedMeshRenderer"))
            .with_child(logic("Spine"));
        let world = TestWorld::without_camera(Scene::new("S").with_root(Entity::new("Root").with_child(hero)));
        let out = SceneGraphWalker::new(ExportSettings::editor_authoring()).walk(&world);
        assert!(out.entities.is_empty());
    }

    #[test]
    fn test_layer_stats_count_visited_nodes() {
        let root = Entity::new("Root")
            .with_child(logic("A").with_layer(4))
            .with_child(Entity::new("Decor").with_layer(4))
            .with_child(logic("Off").with_layer(4).inactive());
        let world = TestWorld::without_camera(Scene::new("S").with_root(root));

        let out = SceneGraphWalker::new(ExportSettings::default().with_layer_stats(true)).walk(&world);
        let counts = out.layer_counts.unwrap();
        assert_eq!(counts.get("Default"), Some(&1));
        assert_eq!(counts.get("Water"), Some(&2));

        let out = SceneGraphWalker::new(ExportSettings::default()).walk(&world);
        assert!(out.layer_counts.is_none());
    }

    #[test]
    fn test_viewport_position_is_flipped_and_rounded() {
        let node = logic("Enemy").at(Vec3::new(0.2, 0.3, 4.0));
        let world = TestWorld::new(Scene::new("S").with_root(node));
        let out = SceneGraphWalker::new(ExportSettings::default()).walk(&world);
        assert_eq!(out.entities[0].viewport_pos, Some(SimpleVec2 { x: 0.2, y: 0.7 }));
    }

    #[test]
    fn test_node_behind_camera_has_no_viewport_position() {
        let behind = logic("Behind").at(Vec3::new(0.5, 0.5, -2.0));
        let edge = logic("Edge").at(Vec3::new(0.5, 0.5, 0.0));
        let outside = logic("Outside").at(Vec3::new(1.5, 0.5, 3.0));
        let world = TestWorld::new(
            Scene::new("S").with_root(Entity::new("Root").with_child(behind).with_child(edge).with_child(outside)),
        );
        let out = SceneGraphWalker::new(ExportSettings::default()).walk(&world);
        assert_eq!(out.entities.len(), 3);
        assert!(out.entities.iter().all(|e| e.viewport_pos.is_none()));
    }

    #[test]
    fn test_node_on_perspective_camera_plane_is_off_screen() {
        let camera = crate::scene::PerspectiveCamera::default();
        assert_eq!(viewport_position(&camera, Vec3::new(500.0, 0.0, -1e-8)), None);
        assert!(viewport_position(&camera, Vec3::new(0.0, 0.0, -5.0)).is_some());
    }

    #[test]
    fn test_missing_camera_still_emits_nodes() {
        let world = TestWorld::without_camera(Scene::new("S").with_root(logic("Enemy")));
        let out = SceneGraphWalker::new(ExportSettings::default()).walk(&world);
        assert_eq!(out.entities.len(), 1);
        assert!(out.entities[0].viewport_pos.is_none());
    }

    #[test]
    fn test_visible_grid_tiles_are_dropped() {
        let tile = |name: &str, z: f32| {
            Entity::new(name)
                .with_layer(8)
                .with_capability(Capability::builtin(CapabilityKind::Collider, "BoxCollider"))
                .at(Vec3::new(0.5, 0.5, z))
        };
        let scene = Scene::new("S")
            .with_layers(LayerTable::default().with(8, GRID_TILES_LAYER))
            .with_root(Entity::new("Grid").with_child(tile("OnScreen", 5.0)).with_child(tile("OffScreen", -5.0)));
        let out = SceneGraphWalker::new(ExportSettings::default()).walk(&TestWorld::new(scene));
        assert_eq!(names(&out), vec!["OffScreen"]);
    }

    #[test]
    fn test_output_follows_native_child_order() {
        let root = Entity::new("Root")
            .with_child(logic("B").with_child(logic("B1")))
            .with_child(logic("A"))
            .with_child(logic("C"));
        let world = TestWorld::without_camera(Scene::new("S").with_root(root).with_root(logic("Second")));
        let out = SceneGraphWalker::new(ExportSettings::editor_authoring()).walk(&world);
        assert_eq!(names(&out), vec!["B", "B1", "A", "C", "Second"]);
    }

    #[test]
    fn test_components_deduplicated_in_first_seen_order() {
        let node = Entity::new("Turret")
            .with_capability(Capability::custom("Game", "Aim"))
            .with_capability(Capability::builtin(CapabilityKind::Collider, "BoxCollider"))
            .with_capability(Capability::builtin(CapabilityKind::Collider, "BoxCollider"))
            .with_capability(Capability::builtin(CapabilityKind::PhysicsBody, "Rigidbody"));
        let world = TestWorld::without_camera(Scene::new("S").with_root(node));
        let out = SceneGraphWalker::new(ExportSettings::default()).walk(&world);
        assert_eq!(
            out.entities[0].components,
            Some(vec!["Aim".to_string(), "BoxCollider".to_string()])
        );
    }

    #[test]
    fn test_transform_fields_follow_settings() {
        let node = logic("Crate").with_transform(Transform {
            position: Vec3::new(1.23456, 0.0, -2.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: Vec3::ONE,
        });
        let world = TestWorld::without_camera(Scene::new("S").with_root(node));

        let out = SceneGraphWalker::new(ExportSettings::default().with_transforms(true)).walk(&world);
        let e = &out.entities[0];
        assert_eq!(e.layer.as_deref(), Some("Default"));
        assert_eq!(e.position.map(|p| p.x), Some(1.235));
        assert_eq!(e.rotation.map(|r| r.y), Some(90.0));
        assert!(e.scale.is_none());

        let out = SceneGraphWalker::new(ExportSettings::default()).walk(&world);
        let e = &out.entities[0];
        assert!(e.layer.is_none() && e.position.is_none() && e.rotation.is_none() && e.scale.is_none());
    }

    #[test]
    fn test_non_identity_scale_is_reported() {
        let node = logic("Giant").with_transform(Transform {
            scale: Vec3::new(2.0, 2.0, 2.0),
            ..Transform::default()
        });
        let world = TestWorld::without_camera(Scene::new("S").with_root(node));
        let out = SceneGraphWalker::new(ExportSettings::default().with_transforms(true)).walk(&world);
        assert_eq!(out.entities[0].scale.map(|s| s.x), Some(2.0));
    }
}
