//! Compiler configuration model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;

/// Output layout used by the build and run passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Build-mode output root, relative to the source directory.
    pub target_dir: PathBuf,
    /// Run-mode output root, relative to the caller's output directory.
    pub artifacts_dir: PathBuf,
    /// Sub-directory of either root that receives the artifacts.
    pub cellery_dir: PathBuf,
    /// File name of the metadata document.
    pub metadata_file: String,
    /// Extension appended to the image name for the manifest file.
    pub manifest_extension: String,
}

impl CompilerConfig {
    /// Directory receiving build-mode artifacts for `source_dir`.
    #[must_use]
    pub fn build_output_dir(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(&self.target_dir).join(&self.cellery_dir)
    }

    /// Directory receiving run-mode artifacts under `output_dir`.
    #[must_use]
    pub fn run_output_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.artifacts_dir).join(&self.cellery_dir)
    }

    /// Manifest file name for a cell image called `image_name`.
    #[must_use]
    pub fn manifest_file(&self, image_name: &str) -> String {
        format!("{image_name}{}", self.manifest_extension)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from(constants::DEFAULT_TARGET_DIR),
            artifacts_dir: PathBuf::from(constants::DEFAULT_ARTIFACTS_DIR),
            cellery_dir: PathBuf::from(constants::DEFAULT_CELLERY_DIR),
            metadata_file: constants::METADATA_FILE.into(),
            manifest_extension: constants::YAML_EXTENSION.into(),
        }
    }
}
