//! Build and run passes over a `.cell` source directory.
//!
//! Each pass is a single synchronous pipeline: read and parse the entry file,
//! build the model, resolve it for the pass, then write both artifacts. The
//! exit-code functions are the invocation boundary; the `Result` variants are
//! for callers that want the error or the artifact paths.

use std::collections::BTreeMap;
use std::path::Path;

use cellery_common::config::CompilerConfig;
use cellery_common::constants::CELL_EXTENSION;
use cellery_common::error::{CelleryError, Result};
use cellery_common::types::CellImageInfo;
use cellery_compose::component::build_model;
use cellery_compose::parser::parse_cell;
use cellery_compose::resolver::{ResolveMode, ResolvedCell, resolve};
use cellery_manifest::writer::{self, Artifacts};

/// Exit code of a successful pass.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code of a failed pass.
pub const EXIT_FAILURE: i32 = 1;

/// Builds the cell image declared by `entry` inside `source_dir`.
///
/// Writes `<source_dir>/target/cellery/<name>.yaml` and `metadata.json` and
/// returns [`EXIT_SUCCESS`], or logs the error and returns [`EXIT_FAILURE`]
/// without leaving artifacts of this pass behind.
pub fn build(source_dir: &Path, entry: &str, image: &CellImageInfo) -> i32 {
    exit_code(build_artifacts(source_dir, entry, image))
}

/// Runs the cell image declared by `entry` as `image.instance_name`.
///
/// `dependencies` maps every declared cell dependency alias to the image and
/// instance serving it. Writes `<output_dir>/artifacts/cellery/<name>.yaml`
/// and `metadata.json` and returns [`EXIT_SUCCESS`], or logs the error and
/// returns [`EXIT_FAILURE`].
pub fn run(
    source_dir: &Path,
    entry: &str,
    image: &CellImageInfo,
    dependencies: &BTreeMap<String, CellImageInfo>,
    output_dir: &Path,
) -> i32 {
    exit_code(run_artifacts(
        source_dir,
        entry,
        image,
        dependencies,
        output_dir,
    ))
}

/// [`build`] returning the written artifacts.
///
/// # Errors
///
/// Returns the first error of the pass.
pub fn build_artifacts(source_dir: &Path, entry: &str, image: &CellImageInfo) -> Result<Artifacts> {
    build_with_config(source_dir, entry, image, &CompilerConfig::default())
}

/// [`build_artifacts`] with an explicit output layout.
///
/// # Errors
///
/// Returns the first error of the pass.
pub fn build_with_config(
    source_dir: &Path,
    entry: &str,
    image: &CellImageInfo,
    config: &CompilerConfig,
) -> Result<Artifacts> {
    let cell = compile(source_dir, entry, image, &ResolveMode::Build)?;
    writer::write_artifacts(&cell, &config.build_output_dir(source_dir), config)
}

/// [`run`] returning the written artifacts.
///
/// # Errors
///
/// Returns the first error of the pass.
pub fn run_artifacts(
    source_dir: &Path,
    entry: &str,
    image: &CellImageInfo,
    dependencies: &BTreeMap<String, CellImageInfo>,
    output_dir: &Path,
) -> Result<Artifacts> {
    run_with_config(
        source_dir,
        entry,
        image,
        dependencies,
        output_dir,
        &CompilerConfig::default(),
    )
}

/// [`run_artifacts`] with an explicit output layout.
///
/// # Errors
///
/// Returns the first error of the pass.
pub fn run_with_config(
    source_dir: &Path,
    entry: &str,
    image: &CellImageInfo,
    dependencies: &BTreeMap<String, CellImageInfo>,
    output_dir: &Path,
    config: &CompilerConfig,
) -> Result<Artifacts> {
    let mode = ResolveMode::Run {
        dependencies: dependencies.clone(),
    };
    let cell = compile(source_dir, entry, image, &mode)?;
    writer::write_artifacts(&cell, &config.run_output_dir(output_dir), config)
}

/// Reads, parses, models and resolves `entry` without writing anything.
///
/// # Errors
///
/// Returns a validation error if `entry` is not a `.cell` file, an I/O error
/// if it cannot be read, and any parse, model or resolution error.
pub fn compile(
    source_dir: &Path,
    entry: &str,
    image: &CellImageInfo,
    mode: &ResolveMode,
) -> Result<ResolvedCell> {
    if !entry.ends_with(CELL_EXTENSION) {
        return Err(CelleryError::validation(format!(
            "entry file {entry:?} must have the {CELL_EXTENSION} extension"
        )));
    }
    let path = source_dir.join(entry);
    tracing::info!(path = %path.display(), image = %image.image_ref(), "compiling cell");

    let content = std::fs::read_to_string(&path).map_err(|e| CelleryError::io(&path, e))?;
    let file = parse_cell(&content)?;
    let model = build_model(&file)?;
    tracing::debug!(components = model.components.len(), "cell model built");

    resolve(&model, image, mode)
}

fn exit_code(result: Result<Artifacts>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "cell compilation failed");
            EXIT_FAILURE
        }
    }
}
