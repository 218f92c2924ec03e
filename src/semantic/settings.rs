//! Export settings controlling how much of the scene reaches the agent.

use serde::{Deserialize, Serialize};

/// Immutable configuration for one export pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Maximum non-folder depth below a root. Roots sit at depth 0.
    pub max_depth: u32,
    /// Report functional capability names per node.
    pub include_components: bool,
    /// Report layer, position, rotation and non-identity scale per node.
    pub include_transforms: bool,
    /// Bitmask of layer indices to prune.
    pub exclude_layers: u32,
    /// Count visited nodes per layer name.
    pub include_layer_stats: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::default_play_mode()
    }
}

impl ExportSettings {
    /// Compact preset used while the game is running.
    pub const fn default_play_mode() -> Self {
        Self {
            max_depth: 0,
            include_components: true,
            include_transforms: false,
            exclude_layers: 0,
            include_layer_stats: false,
        }
    }

    /// Exhaustive preset for authoring-time exports.
    pub const fn editor_authoring() -> Self {
        Self {
            max_depth: u32::MAX,
            include_components: true,
            include_transforms: true,
            exclude_layers: 0,
            include_layer_stats: true,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_components(mut self, include: bool) -> Self {
        self.include_components = include;
        self
    }

    pub fn with_transforms(mut self, include: bool) -> Self {
        self.include_transforms = include;
        self
    }

    pub fn with_layer_stats(mut self, include: bool) -> Self {
        self.include_layer_stats = include;
        self
    }

    /// Add a layer index to the exclusion mask.
    pub fn excluding_layer(mut self, layer: u8) -> Self {
        if layer < 32 {
            self.exclude_layers |= 1 << layer;
        }
        self
    }

    pub fn is_layer_excluded(&self, layer: u8) -> bool {
        layer < 32 && (self.exclude_layers & (1 << layer)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_mode_preset() {
        let s = ExportSettings::default_play_mode();
        assert_eq!(s.max_depth, 0);
        assert!(s.include_components);
        assert!(!s.include_transforms);
        assert!(!s.include_layer_stats);
        assert_eq!(s, ExportSettings::default());
    }

    #[test]
    fn test_editor_preset_is_unbounded() {
        let s = ExportSettings::editor_authoring();
        assert_eq!(s.max_depth, u32::MAX);
        assert!(s.include_transforms);
        assert!(s.include_layer_stats);
    }

    #[test]
    fn test_layer_mask() {
        let s = ExportSettings::default().excluding_layer(3).excluding_layer(31);
        assert!(s.is_layer_excluded(3));
        assert!(s.is_layer_excluded(31));
        assert!(!s.is_layer_excluded(0));
        assert!(!s.is_layer_excluded(40));
        assert_eq!(ExportSettings::default().excluding_layer(40).exclude_layers, 0);
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let s: ExportSettings = serde_yaml::from_str("max_depth: 2\ninclude_transforms: true\n").unwrap();
        assert_eq!(s.max_depth, 2);
        assert!(s.include_transforms);
        assert!(s.include_components);
    }
}
