//! Flat image metadata document (`metadata.json`).
//!
//! The document has exactly seven top-level keys: the image triple, the
//! image kind, the two scaling flags and the component map. Components are
//! keyed by declared name, so it is identical for build and run passes of the same
//! image.

use std::collections::BTreeMap;

use cellery_common::constants::CELL_KIND;
use cellery_common::types::ImageRef;
use cellery_compose::resolver::{ResolvedCell, ResolvedComponent};
use serde::{Deserialize, Serialize};

/// Root of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellMetadata {
    /// Image kind; always `Cell`.
    pub kind: String,
    /// Image organization.
    pub org: String,
    /// Image name.
    pub name: String,
    /// Image version.
    pub ver: String,
    /// Per-component metadata keyed by declared name.
    pub components: BTreeMap<String, ComponentMetadata>,
    /// Whether any component scales to zero.
    pub zero_scaling_required: bool,
    /// Whether any component autoscales.
    pub auto_scaling_required: bool,
}

/// Metadata of a single component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    /// Container image reference.
    pub docker_image: String,
    /// Whether the image is built from source and must be pushed.
    pub is_docker_push_required: bool,
    /// Kubernetes labels.
    pub labels: BTreeMap<String, String>,
    /// What the component calls.
    pub dependencies: Dependencies,
}

/// Dependencies of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Components of the same cell.
    pub components: Vec<String>,
    /// Other cells keyed by alias.
    pub cells: BTreeMap<String, ImageRef>,
}

impl From<&ResolvedCell> for CellMetadata {
    fn from(cell: &ResolvedCell) -> Self {
        Self {
            kind: CELL_KIND.into(),
            org: cell.image.org.clone(),
            name: cell.image.name.clone(),
            ver: cell.image.ver.clone(),
            components: cell
                .components
                .iter()
                .map(|c| (c.declared_name.clone(), ComponentMetadata::from(c)))
                .collect(),
            zero_scaling_required: cell.zero_scaling_required(),
            auto_scaling_required: cell.auto_scaling_required(),
        }
    }
}

impl From<&ResolvedComponent> for ComponentMetadata {
    fn from(comp: &ResolvedComponent) -> Self {
        Self {
            docker_image: comp.image.clone(),
            is_docker_push_required: comp.push_required,
            labels: comp.labels.clone(),
            dependencies: Dependencies {
                components: comp.component_dependencies.clone(),
                cells: comp.cell_dependencies.clone(),
            },
        }
    }
}
