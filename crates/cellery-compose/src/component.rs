//! Component model builder.
//!
//! Turns a parsed [`CellFile`] into a [`CellModel`]: labels are collected,
//! `host()` references are classified as component or cell hosts, scaling
//! blocks are translated, and intra-cell dependencies are checked for cycles.

use std::collections::{BTreeMap, HashSet};

use cellery_common::error::Result;
use cellery_common::types::ImageRef;

use crate::graph::DependencyGraph;
use crate::model::{Api, ApiDefinition, CellModel, ComponentSpec, EnvBinding, EnvValue};
use crate::parser::ast::{CellFile, ComponentDecl, DependsDecl, EnvValueDecl};
use crate::parser::validator;
use crate::scaling;

/// Builds the cell model from a parsed file, preserving declaration order.
///
/// # Errors
///
/// Returns [`cellery_common::error::CelleryError::Validation`] for malformed,
/// duplicate or cyclic declarations and
/// [`cellery_common::error::CelleryError::InvalidScalingPolicy`] for bad
/// scaling blocks.
pub fn build_model(file: &CellFile) -> Result<CellModel> {
    validator::validate(file)?;

    let components = file
        .components
        .iter()
        .map(build_component)
        .collect::<Result<Vec<_>>>()?;
    let model = CellModel { components };

    let order = DependencyGraph::from_model(&model).resolve_order()?;
    tracing::debug!(order = ?order, "component dependency order");
    tracing::info!(components = model.components.len(), "built cell model");
    Ok(model)
}

fn build_component(decl: &ComponentDecl) -> Result<ComponentSpec> {
    let mut cell_dependencies = BTreeMap::new();
    let mut component_dependencies = Vec::new();
    for dep in &decl.depends {
        match dep {
            DependsDecl::Component(name) => push_unique(&mut component_dependencies, name),
            DependsDecl::Cell { alias, image } => {
                let image: ImageRef = image.parse()?;
                let _ = cell_dependencies.insert(alias.clone(), image);
            }
        }
    }

    let env = decl
        .env
        .iter()
        .map(|e| {
            let value = match &e.value {
                EnvValueDecl::Literal(text) => EnvValue::Literal(text.clone()),
                EnvValueDecl::Host(target) if cell_dependencies.contains_key(target) => {
                    EnvValue::CellHost(target.clone())
                }
                EnvValueDecl::Host(target) => {
                    push_unique(&mut component_dependencies, target);
                    EnvValue::ComponentHost(target.clone())
                }
            };
            EnvBinding {
                name: e.name.clone(),
                value,
            }
        })
        .collect();

    let apis = decl
        .ingresses
        .iter()
        .map(|ingress| Api {
            context: ingress.context.clone(),
            global: ingress.global,
            definitions: ingress
                .definitions
                .iter()
                .map(|(method, path)| ApiDefinition {
                    method: method.clone(),
                    path: path.clone(),
                })
                .collect(),
        })
        .collect();

    Ok(ComponentSpec {
        name: decl.name.clone(),
        labels: decl.labels.iter().cloned().collect(),
        image: decl.image.clone().unwrap_or_default(),
        push_required: decl.source.is_some(),
        ports: dedup_ports(&decl.ports),
        env,
        scaling: scaling::translate(&decl.name, &decl.scaling)?,
        apis,
        component_dependencies,
        cell_dependencies,
    })
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_owned());
    }
}

fn dedup_ports(ports: &[u16]) -> Vec<u16> {
    let mut seen = HashSet::new();
    ports.iter().copied().filter(|p| seen.insert(*p)).collect()
}
