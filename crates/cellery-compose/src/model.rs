//! In-memory cell model produced by the component model builder.
//!
//! The model is immutable input to the resolver: each build or run pass
//! resolves a fresh model and never mutates it.

use std::collections::BTreeMap;

use cellery_common::types::ImageRef;
use serde::{Deserialize, Serialize};

use crate::scaling::ScalingPolicy;

/// All components of one cell, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellModel {
    /// Components in declaration order; names are unique.
    pub components: Vec<ComponentSpec>,
}

impl CellModel {
    /// Looks up a component by declared name.
    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// One containerized service of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Declared component name.
    pub name: String,
    /// Kubernetes labels.
    pub labels: BTreeMap<String, String>,
    /// Container image reference.
    pub image: String,
    /// Whether the image is built locally and must be pushed before deploying.
    pub push_required: bool,
    /// Container ports in declaration order.
    pub ports: Vec<u16>,
    /// Environment bindings in declaration order.
    pub env: Vec<EnvBinding>,
    /// Scaling policy, if any.
    pub scaling: Option<ScalingPolicy>,
    /// HTTP APIs routed to this component through the cell gateway.
    pub apis: Vec<Api>,
    /// Components of the same cell this component calls.
    pub component_dependencies: Vec<String>,
    /// Other cells this component calls, keyed by alias.
    pub cell_dependencies: BTreeMap<String, ImageRef>,
}

/// A named environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvBinding {
    /// Variable name.
    pub name: String,
    /// Unresolved value.
    pub value: EnvValue,
}

/// Environment value before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvValue {
    /// Literal text; may contain `{{instance_name}}`.
    Literal(String),
    /// Service host of a component in the same cell.
    ComponentHost(String),
    /// Gateway host of a dependency cell, by alias.
    CellHost(String),
}

/// An HTTP API exposed through the gateway under one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Api {
    /// URL prefix, unique within the cell gateway.
    pub context: String,
    /// Whether the API is published beyond the cell.
    pub global: bool,
    /// Routes in declaration order.
    pub definitions: Vec<ApiDefinition>,
}

/// A single method/path route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
}
