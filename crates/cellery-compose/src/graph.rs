//! Intra-cell dependency graph using `petgraph`.
//!
//! Builds a directed graph from component dependencies, rejects cycles, and
//! yields a dependencies-first ordering for diagnostics.

use std::collections::HashMap;

use cellery_common::error::{CelleryError, Result};
use petgraph::graph::NodeIndex;

use crate::model::CellModel;

/// A dependency graph of the components of one cell.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Builds the graph of every component and its intra-cell dependencies.
    ///
    /// References to unknown components are skipped; the validator reports
    /// those before a model exists.
    #[must_use]
    pub fn from_model(model: &CellModel) -> Self {
        let mut graph = Self::new();
        let nodes: HashMap<&str, NodeIndex> = model
            .components
            .iter()
            .map(|c| (c.name.as_str(), graph.add_component(&c.name)))
            .collect();
        for comp in &model.components {
            for dep in &comp.component_dependencies {
                if let (Some(&from), Some(&to)) =
                    (nodes.get(comp.name.as_str()), nodes.get(dep.as_str()))
                {
                    graph.add_dependency(from, to);
                }
            }
        }
        graph
    }

    /// Adds a component node to the graph.
    pub fn add_component(&mut self, name: impl Into<String>) -> NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns the components ordered dependencies-first.
    ///
    /// # Errors
    ///
    /// Returns [`CelleryError::Validation`] naming a component on the cycle
    /// if the graph is cyclic.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => {
                let node = self
                    .graph
                    .node_weight(cycle.node_id())
                    .map_or("<unknown>", String::as_str);
                Err(CelleryError::validation(format!(
                    "cyclic dependency detected in component graph at \"{node}\""
                )))
            }
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
