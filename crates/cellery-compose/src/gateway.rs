//! Gateway routing table synthesis.
//!
//! Collects the APIs of every component, in component declaration order,
//! into the ordered ingress table of the cell gateway.

use std::collections::HashMap;

use cellery_common::error::{CelleryError, Result};
use serde::{Deserialize, Serialize};

use crate::model::{ApiDefinition, CellModel};

/// One entry of the gateway ingress table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRoute {
    /// URL prefix routed to the destination.
    pub context: String,
    /// Routes in declaration order.
    pub definitions: Vec<ApiDefinition>,
    /// Host of the owning component.
    pub destination_host: String,
    /// First container port of the owning component, if it declares one.
    pub destination_port: Option<u16>,
    /// Whether the API is published beyond the cell.
    pub global: bool,
}

/// Builds the ordered ingress table for `model`.
///
/// # Errors
///
/// Returns [`CelleryError::DuplicateContext`] if two APIs share a context.
pub fn synthesize(model: &CellModel) -> Result<Vec<GatewayRoute>> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut routes = Vec::new();

    for comp in &model.components {
        for api in &comp.apis {
            if let Some(first) = owners.insert(api.context.as_str(), comp.name.as_str()) {
                return Err(CelleryError::DuplicateContext {
                    context: api.context.clone(),
                    first: first.into(),
                    second: comp.name.clone(),
                });
            }
            routes.push(GatewayRoute {
                context: api.context.clone(),
                definitions: api.definitions.clone(),
                destination_host: comp.name.clone(),
                destination_port: comp.ports.first().copied(),
                global: api.global,
            });
        }
    }

    tracing::debug!(routes = routes.len(), "synthesized gateway ingress table");
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{Api, ComponentSpec};

    fn component(name: &str, ports: Vec<u16>, contexts: &[&str]) -> ComponentSpec {
        ComponentSpec {
            name: name.into(),
            labels: BTreeMap::new(),
            image: format!("{name}:latest"),
            push_required: false,
            ports,
            env: Vec::new(),
            scaling: None,
            apis: contexts
                .iter()
                .map(|ctx| Api {
                    context: (*ctx).into(),
                    global: false,
                    definitions: vec![ApiDefinition {
                        method: "GET".into(),
                        path: format!("/{ctx}"),
                    }],
                })
                .collect(),
            component_dependencies: Vec::new(),
            cell_dependencies: BTreeMap::new(),
        }
    }

    #[test]
    fn routes_follow_component_order() {
        let model = CellModel {
            components: vec![
                component("employee", vec![8080], &["employee"]),
                component("salary", vec![8080], &["payroll"]),
            ],
        };
        let routes = synthesize(&model).expect("synthesize");
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].context, "employee");
        assert_eq!(routes[0].destination_host, "employee");
        assert_eq!(routes[1].context, "payroll");
        assert_eq!(routes[1].destination_host, "salary");
        assert_eq!(routes[1].destination_port, Some(8080));
    }

    #[test]
    fn component_without_apis_contributes_nothing() {
        let model = CellModel {
            components: vec![
                component("debug", Vec::new(), &[]),
                component("pet-service", vec![9090], &["petsvc"]),
            ],
        };
        let routes = synthesize(&model).expect("synthesize");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].context, "petsvc");
    }

    #[test]
    fn portless_destination_has_no_port() {
        let model = CellModel {
            components: vec![component("api", Vec::new(), &["api"])],
        };
        let routes = synthesize(&model).expect("synthesize");
        assert_eq!(routes[0].destination_port, None);
    }

    #[test]
    fn duplicate_context_across_components_fails() {
        let model = CellModel {
            components: vec![
                component("salary", vec![8080], &["payroll"]),
                component("employee", vec![8080], &["payroll"]),
            ],
        };
        let err = synthesize(&model).unwrap_err();
        match err {
            CelleryError::DuplicateContext {
                context,
                first,
                second,
            } => {
                assert_eq!(context, "payroll");
                assert_eq!(first, "salary");
                assert_eq!(second, "employee");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_context_within_component_fails() {
        let model = CellModel {
            components: vec![component("salary", vec![8080], &["payroll", "payroll"])],
        };
        assert!(matches!(
            synthesize(&model),
            Err(CelleryError::DuplicateContext { .. })
        ));
    }
}
