//! Assembles a [`SemanticDocument`] from one walk of the active scene.

use log::debug;

use crate::scene::SceneSource;
use crate::semantic::document::SemanticDocument;
use crate::semantic::heuristics::HeuristicClassifier;
use crate::semantic::settings::ExportSettings;
use crate::semantic::walker::SceneGraphWalker;

#[derive(Debug, Clone, Default)]
pub struct SemanticDocumentBuilder {
    walker: SceneGraphWalker,
}

impl SemanticDocumentBuilder {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            walker: SceneGraphWalker::new(settings),
        }
    }

    pub fn with_classifier(settings: ExportSettings, classifier: HeuristicClassifier) -> Self {
        Self {
            walker: SceneGraphWalker::with_classifier(settings, classifier),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        self.walker.settings()
    }

    /// Walk `source` once and wrap the result.
    ///
    /// Pure with respect to the host: nothing in the scene is touched.
    pub fn build(&self, source: &dyn SceneSource) -> SemanticDocument {
        let out = self.walker.walk(source);
        let mut doc = SemanticDocument::new(source.scene_name());
        doc.entities = out.entities;
        doc.layer_counts = out.layer_counts;
        debug!(
            "Built semantic document for '{}' with {} entities",
            doc.scene_name,
            doc.entities.len()
        );
        doc
    }
}
