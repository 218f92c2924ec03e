//! Export of the active scene to a JSON file on disk.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::scene::SceneSource;
use crate::semantic::builder::SemanticDocumentBuilder;
use crate::semantic::settings::ExportSettings;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Indented JSON for `source` under `settings`.
pub fn export_json(source: &dyn SceneSource, settings: ExportSettings) -> Result<String, ExportError> {
    let doc = SemanticDocumentBuilder::new(settings).build(source);
    Ok(doc.to_json_pretty()?)
}

/// Write the indented document to `path`, creating parent directories.
/// Returns the number of bytes written.
pub fn export_to_file(
    source: &dyn SceneSource,
    settings: ExportSettings,
    path: impl AsRef<Path>,
) -> Result<usize, ExportError> {
    let path = path.as_ref();
    let json = export_json(source, settings)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &json).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "Scene '{}' exported to {} (max depth: {})",
        source.scene_name(),
        path.display(),
        settings.max_depth
    );
    Ok(json.len())
}
