//! # Semantic scene export
//!
//! Turns a large host hierarchy into a small document an agent can read.
//!
//! ```text
//! ExportSettings ──┐
//!                  ▼
//! SceneSource ──► SceneGraphWalker ◄── HeuristicClassifier
//!                  │ WalkOutput { entities, layer_counts }
//!                  ▼
//!            SemanticDocumentBuilder ──► SemanticDocument ──► JSON
//! ```
//!
//! The export is lossy on purpose: folders, visual-only nodes, engine
//! internals and character rigs are dropped so that the payload stays
//! bounded for any scene size.

pub mod builder;
pub mod document;
pub mod exporter;
pub mod heuristics;
pub mod settings;
pub mod walker;

pub use builder::SemanticDocumentBuilder;
pub use document::{SemanticDocument, SemanticNode, SimpleVec2, SimpleVec3, SCENE_CONTEXT};
pub use exporter::{export_json, export_to_file, ExportError};
pub use heuristics::HeuristicClassifier;
pub use settings::ExportSettings;
pub use walker::{SceneGraphWalker, WalkOutput, GRID_TILES_LAYER};
