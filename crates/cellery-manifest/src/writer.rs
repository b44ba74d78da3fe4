//! Artifact rendering, staged writing and reading.
//!
//! Both documents are rendered to memory before anything touches the
//! filesystem, staged as temporary files in the destination directory and
//! only then moved into place. A failed pass leaves no new artifact behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use cellery_common::config::CompilerConfig;
use cellery_common::error::{CelleryError, Result};
use cellery_compose::resolver::ResolvedCell;
use tempfile::NamedTempFile;

use crate::cell::Cell;
use crate::metadata::CellMetadata;

/// Paths of the artifacts written for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// The `Cell` manifest.
    pub manifest_path: PathBuf,
    /// The metadata document.
    pub metadata_path: PathBuf,
}

/// Renders the `Cell` manifest as YAML.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn render_manifest(cell: &ResolvedCell) -> Result<String> {
    Ok(serde_yaml::to_string(&Cell::from(cell))?)
}

/// Renders the metadata document as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_metadata(cell: &ResolvedCell) -> Result<String> {
    Ok(serde_json::to_string_pretty(&CellMetadata::from(cell))?)
}

/// Writes both artifacts of `cell` into `dir`.
///
/// The manifest is named after the image and the metadata file after
/// `config.metadata_file`. `dir` is created if missing.
///
/// # Errors
///
/// Returns an error if rendering fails or the directory or files cannot be
/// written. On error neither artifact of this pass is left in `dir`.
pub fn write_artifacts(cell: &ResolvedCell, dir: &Path, config: &CompilerConfig) -> Result<Artifacts> {
    let manifest = render_manifest(cell)?;
    let metadata = render_metadata(cell)?;

    std::fs::create_dir_all(dir).map_err(|e| CelleryError::io(dir, e))?;

    let artifacts = Artifacts {
        manifest_path: dir.join(config.manifest_file(&cell.image.name)),
        metadata_path: dir.join(&config.metadata_file),
    };

    let staged_manifest = stage(dir, &manifest)?;
    let staged_metadata = stage(dir, &metadata)?;

    let _ = staged_manifest
        .persist(&artifacts.manifest_path)
        .map_err(|e| CelleryError::io(&artifacts.manifest_path, e.error))?;
    if let Err(e) = staged_metadata.persist(&artifacts.metadata_path) {
        if let Err(cleanup) = std::fs::remove_file(&artifacts.manifest_path) {
            tracing::warn!(
                path = %artifacts.manifest_path.display(),
                error = %cleanup,
                "failed to remove manifest after metadata write error"
            );
        }
        return Err(CelleryError::io(&artifacts.metadata_path, e.error));
    }

    tracing::info!(
        cell = %cell.name,
        manifest = %artifacts.manifest_path.display(),
        metadata = %artifacts.metadata_path.display(),
        "artifacts written"
    );
    Ok(artifacts)
}

fn stage(dir: &Path, contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir).map_err(|e| CelleryError::io(dir, e))?;
    if let Err(e) = file.write_all(contents.as_bytes()).and_then(|()| file.flush()) {
        return Err(CelleryError::io(file.path(), e));
    }
    Ok(file)
}

/// Reads a `Cell` manifest back from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid manifest.
pub fn read_cell_yaml(path: &Path) -> Result<Cell> {
    let content = std::fs::read_to_string(path).map_err(|e| CelleryError::io(path, e))?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Reads a metadata document back from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid metadata.
pub fn read_metadata(path: &Path) -> Result<CellMetadata> {
    let content = std::fs::read_to_string(path).map_err(|e| CelleryError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}
