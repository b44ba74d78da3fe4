//! Build-time and run-time dependency resolution.
//!
//! [`resolve`] is a pure function of the model, the image identity and the
//! mode. Build mode keeps the declared name as identity and leaves
//! `{{instance_name}}` unexpanded. Run mode takes the instance name as
//! identity, expands the token, and maps every cross-cell dependency to the
//! instance supplied for it.

use std::collections::BTreeMap;

use cellery_common::constants::INSTANCE_NAME_TOKEN;
use cellery_common::error::{CelleryError, Result};
use cellery_common::types::{CellImageInfo, ImageRef};
use serde::{Deserialize, Serialize};

use crate::gateway::{self, GatewayRoute};
use crate::model::{CellModel, ComponentSpec, EnvValue};
use crate::parser::validator;
use crate::scaling::ScalingPolicy;
use crate::template;

/// Resolution pass parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveMode {
    /// Compile the image: identity is the declared name.
    Build,
    /// Instantiate the image: identity is the instance name.
    Run {
        /// Instance info of each cross-cell dependency, keyed by alias.
        dependencies: BTreeMap<String, CellImageInfo>,
    },
}

impl ResolveMode {
    /// Run mode without cross-cell dependencies.
    #[must_use]
    pub const fn run() -> Self {
        Self::Run {
            dependencies: BTreeMap::new(),
        }
    }

    /// Whether this is the build pass.
    #[must_use]
    pub const fn is_build(&self) -> bool {
        matches!(self, Self::Build)
    }
}

/// A cell resolved for one pass, ready for emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCell {
    /// Manifest identity: declared name at build time, instance name at run time.
    pub name: String,
    /// Image identity supplied by the caller.
    pub image: CellImageInfo,
    /// Components in declaration order.
    pub components: Vec<ResolvedComponent>,
    /// Gateway ingress table.
    pub gateway: Vec<GatewayRoute>,
}

impl ResolvedCell {
    /// Whether any component scales to zero.
    #[must_use]
    pub fn zero_scaling_required(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.scaling.as_ref().is_some_and(ScalingPolicy::is_scale_to_zero))
    }

    /// Whether any component autoscales.
    #[must_use]
    pub fn auto_scaling_required(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.scaling.as_ref().is_some_and(ScalingPolicy::is_autoscale))
    }
}

/// A component with every environment value resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedComponent {
    /// Name as declared in the source.
    pub declared_name: String,
    /// Name emitted in the manifest.
    pub name: String,
    /// Kubernetes labels.
    pub labels: BTreeMap<String, String>,
    /// Container image reference.
    pub image: String,
    /// Whether the image must be pushed before deploying.
    pub push_required: bool,
    /// Container ports.
    pub ports: Vec<u16>,
    /// Resolved `(name, value)` environment pairs in declaration order.
    pub env: Vec<(String, String)>,
    /// Scaling policy, if any.
    pub scaling: Option<ScalingPolicy>,
    /// Components of the same cell this component calls.
    pub component_dependencies: Vec<String>,
    /// Other cells this component calls, keyed by alias.
    pub cell_dependencies: BTreeMap<String, ImageRef>,
}

/// Resolves `model` for the pass described by `mode`.
///
/// # Errors
///
/// Returns [`CelleryError::UnresolvedDependency`] if run mode lacks an
/// instance for a declared cell dependency,
/// [`CelleryError::DuplicateContext`] if two APIs share a context, and
/// [`CelleryError::Validation`] if a run-mode instance name is not a DNS-1123
/// label or collides with another component of the cell.
pub fn resolve(model: &CellModel, image: &CellImageInfo, mode: &ResolveMode) -> Result<ResolvedCell> {
    let name = match mode {
        ResolveMode::Build => image.name.clone(),
        ResolveMode::Run { .. } => {
            check_instance_name(model, image)?;
            image.instance_name.clone()
        }
    };
    tracing::info!(
        cell = %name,
        image = %image.image_ref(),
        build = mode.is_build(),
        "resolving cell"
    );

    let components = model
        .components
        .iter()
        .map(|comp| resolve_component(comp, image, mode))
        .collect::<Result<Vec<_>>>()?;
    let gateway = gateway::synthesize(model)?;

    Ok(ResolvedCell {
        name,
        image: image.clone(),
        components,
        gateway,
    })
}

/// The run-mode instance name must be a DNS-1123 label and must not rename
/// the image component onto one of its siblings.
fn check_instance_name(model: &CellModel, image: &CellImageInfo) -> Result<()> {
    let instance = &image.instance_name;
    if !validator::is_dns_label(instance) {
        return Err(CelleryError::validation(format!(
            "instance name {instance:?} of cell image {} is not a valid DNS-1123 label",
            image.image_ref()
        )));
    }
    if model.component(&image.name).is_none() {
        return Ok(());
    }
    match model
        .components
        .iter()
        .find(|c| c.name != image.name && c.name == *instance)
    {
        Some(clash) => Err(CelleryError::validation(format!(
            "instance name {instance:?} collides with component \"{}\"",
            clash.name
        ))),
        None => Ok(()),
    }
}

fn resolve_component(
    comp: &ComponentSpec,
    image: &CellImageInfo,
    mode: &ResolveMode,
) -> Result<ResolvedComponent> {
    let instances = dependency_instances(comp, mode)?;

    let env = comp
        .env
        .iter()
        .map(|binding| {
            let value = resolve_value(&binding.value, image, mode, &instances);
            tracing::debug!(
                component = %comp.name,
                env = %binding.name,
                value = %value,
                templated = template::has_instance_token(&value),
                "resolved environment value"
            );
            (binding.name.clone(), value)
        })
        .collect();

    let name = match mode {
        ResolveMode::Run { .. } if comp.name == image.name => image.instance_name.clone(),
        _ => comp.name.clone(),
    };

    Ok(ResolvedComponent {
        declared_name: comp.name.clone(),
        name,
        labels: comp.labels.clone(),
        image: comp.image.clone(),
        push_required: comp.push_required,
        ports: comp.ports.clone(),
        env,
        scaling: comp.scaling.clone(),
        component_dependencies: comp.component_dependencies.clone(),
        cell_dependencies: comp.cell_dependencies.clone(),
    })
}

/// Instance name of every cell dependency of `comp`, keyed by alias.
///
/// Build mode maps each alias to its own `{{alias}}` token.
fn dependency_instances(comp: &ComponentSpec, mode: &ResolveMode) -> Result<BTreeMap<String, String>> {
    let mut instances = BTreeMap::new();
    for (alias, declared) in &comp.cell_dependencies {
        let instance = match mode {
            ResolveMode::Build => template::placeholder(alias),
            ResolveMode::Run { dependencies } => {
                let supplied =
                    dependencies
                        .get(alias)
                        .ok_or_else(|| CelleryError::UnresolvedDependency {
                            component: comp.name.clone(),
                            dependency: alias.clone(),
                        })?;
                if !validator::is_dns_label(&supplied.instance_name) {
                    return Err(CelleryError::validation(format!(
                        "instance name {:?} supplied for dependency \"{alias}\" of \
                         component \"{}\" is not a valid DNS-1123 label",
                        supplied.instance_name, comp.name
                    )));
                }
                if supplied.image_ref() != *declared {
                    tracing::warn!(
                        component = %comp.name,
                        dependency = %alias,
                        declared = %declared,
                        supplied = %supplied.image_ref(),
                        "dependency instance runs a different image than declared"
                    );
                }
                supplied.instance_name.clone()
            }
        };
        let _ = instances.insert(alias.clone(), instance);
    }
    Ok(instances)
}

/// Applies the (mode, reference kind) policy to one environment value.
fn resolve_value(
    value: &EnvValue,
    image: &CellImageInfo,
    mode: &ResolveMode,
    instances: &BTreeMap<String, String>,
) -> String {
    let text = match value {
        EnvValue::Literal(text) => text.clone(),
        EnvValue::ComponentHost(target) => template::service_host(INSTANCE_NAME_TOKEN, target),
        EnvValue::CellHost(alias) => {
            let instance = instances
                .get(alias)
                .cloned()
                .unwrap_or_else(|| template::placeholder(alias));
            template::gateway_host(&instance)
        }
    };
    match mode {
        ResolveMode::Build => text,
        ResolveMode::Run { .. } => template::expand_instance_name(&text, &image.instance_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::build_model;
    use crate::parser::parse_cell;

    const EMPLOYEE: &str = r#"
COMPONENT employee {
    image = "wso2cellery/sampleapp-employee:0.3.0"
    ports = [8080]
    labels = { team = "HR" }
    env = {
        SALARY_HOST = host(salary)
        SELF = "{{instance_name}}"
        OTHER = "{{tenant}}"
    }
    INGRESS employee { GET "/details" }
}
COMPONENT salary {
    image = "wso2cellery/sampleapp-salary:0.3.0"
    ports = [8080]
    labels = { team = "Finance", owner = "Alice" }
    INGRESS payroll { GET "salary" }
}
"#;

    const WITH_CELL_DEP: &str = r#"
COMPONENT portal {
    image = "myorg/portal:1.0.0"
    env = { STOCK_HOST = host(stock) }
    DEPENDS CELL stock = "myorg/stock:1.0.0"
}
"#;

    fn model(input: &str) -> CellModel {
        build_model(&parse_cell(input).expect("parse")).expect("build")
    }

    fn info() -> CellImageInfo {
        CellImageInfo::new("myorg", "employee", "1.0.0", "emp-inst")
    }

    fn env<'a>(cell: &'a ResolvedCell, component: usize, name: &str) -> &'a str {
        cell.components[component]
            .env
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .expect(name)
    }

    #[test]
    fn build_mode_keeps_declared_identity_and_tokens() {
        let cell = resolve(&model(EMPLOYEE), &info(), &ResolveMode::Build).expect("resolve");
        assert_eq!(cell.name, "employee");
        assert_eq!(cell.components[0].name, "employee");
        assert_eq!(env(&cell, 0, "SALARY_HOST"), "{{instance_name}}--salary-service");
        assert_eq!(env(&cell, 0, "SELF"), "{{instance_name}}");
        assert_eq!(env(&cell, 0, "OTHER"), "{{tenant}}");
    }

    #[test]
    fn run_mode_expands_instance_tokens() {
        let cell = resolve(&model(EMPLOYEE), &info(), &ResolveMode::run()).expect("resolve");
        assert_eq!(cell.name, "emp-inst");
        assert_eq!(env(&cell, 0, "SALARY_HOST"), "emp-inst--salary-service");
        assert_eq!(env(&cell, 0, "SELF"), "emp-inst");
        assert_eq!(env(&cell, 0, "OTHER"), "{{tenant}}");
    }

    #[test]
    fn run_mode_renames_component_named_after_image() {
        let cell = resolve(&model(EMPLOYEE), &info(), &ResolveMode::run()).expect("resolve");
        assert_eq!(cell.components[0].name, "emp-inst");
        assert_eq!(cell.components[0].declared_name, "employee");
        assert_eq!(cell.components[1].name, "salary");
    }

    #[test]
    fn gateway_is_identical_across_modes() {
        let model = model(EMPLOYEE);
        let built = resolve(&model, &info(), &ResolveMode::Build).expect("build");
        let ran = resolve(&model, &info(), &ResolveMode::run()).expect("run");
        assert_eq!(built.gateway, ran.gateway);
        assert_eq!(ran.gateway[0].destination_host, "employee");
        assert_eq!(ran.gateway[1].context, "payroll");
    }

    #[test]
    fn build_mode_is_deterministic() {
        let model = model(EMPLOYEE);
        let first = resolve(&model, &info(), &ResolveMode::Build).expect("first");
        let second = resolve(&model, &info(), &ResolveMode::Build).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn build_mode_tokenizes_cell_dependency_host() {
        let info = CellImageInfo::new("myorg", "portal", "1.0.0", "portal-inst");
        let cell = resolve(&model(WITH_CELL_DEP), &info, &ResolveMode::Build).expect("resolve");
        assert_eq!(env(&cell, 0, "STOCK_HOST"), "{{stock}}--gateway-service");
    }

    #[test]
    fn run_mode_uses_supplied_dependency_instance() {
        let info = CellImageInfo::new("myorg", "portal", "1.0.0", "portal-inst");
        let mut dependencies = BTreeMap::new();
        let _ = dependencies.insert(
            "stock".to_string(),
            CellImageInfo::new("myorg", "stock", "1.0.0", "stock-inst"),
        );
        let cell = resolve(&model(WITH_CELL_DEP), &info, &ResolveMode::Run { dependencies })
            .expect("resolve");
        assert_eq!(env(&cell, 0, "STOCK_HOST"), "stock-inst--gateway-service");
        assert_eq!(cell.components[0].name, "portal-inst");
    }

    #[test]
    fn run_mode_without_dependency_instance_fails() {
        let info = CellImageInfo::new("myorg", "portal", "1.0.0", "portal-inst");
        let err = resolve(&model(WITH_CELL_DEP), &info, &ResolveMode::run()).unwrap_err();
        match err {
            CelleryError::UnresolvedDependency {
                component,
                dependency,
            } => {
                assert_eq!(component, "portal");
                assert_eq!(dependency, "stock");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn run_mode_requires_instance_name() {
        let info = CellImageInfo::new("myorg", "employee", "1.0.0", "");
        assert!(resolve(&model(EMPLOYEE), &info, &ResolveMode::run()).is_err());
    }

    #[test]
    fn run_mode_rejects_instance_name_of_sibling_component() {
        let info = CellImageInfo::new("myorg", "employee", "1.0.0", "salary");
        let err = resolve(&model(EMPLOYEE), &info, &ResolveMode::run()).unwrap_err();
        assert!(matches!(err, CelleryError::Validation { .. }), "{err}");
        assert!(err.to_string().contains("salary"), "{err}");
    }

    #[test]
    fn run_mode_allows_sibling_name_when_nothing_is_renamed() {
        let info = CellImageInfo::new("myorg", "hr", "1.0.0", "salary");
        let cell = resolve(&model(EMPLOYEE), &info, &ResolveMode::run()).expect("resolve");
        assert_eq!(cell.name, "salary");
        assert_eq!(cell.components[0].name, "employee");
        assert_eq!(cell.components[1].name, "salary");
    }

    #[test]
    fn run_mode_rejects_malformed_instance_name() {
        for bad in ["Not A Dns {{x}}", "Emp-Inst", "emp-inst-", "{{instance_name}}"] {
            let info = CellImageInfo::new("myorg", "employee", "1.0.0", bad);
            let err = resolve(&model(EMPLOYEE), &info, &ResolveMode::run()).unwrap_err();
            assert!(matches!(err, CelleryError::Validation { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn build_mode_ignores_instance_name() {
        let info = CellImageInfo::new("myorg", "employee", "1.0.0", "salary");
        let cell = resolve(&model(EMPLOYEE), &info, &ResolveMode::Build).expect("resolve");
        assert_eq!(cell.components[0].name, "employee");
    }

    #[test]
    fn run_mode_rejects_malformed_dependency_instance_name() {
        let info = CellImageInfo::new("myorg", "portal", "1.0.0", "portal-inst");
        let mut dependencies = BTreeMap::new();
        let _ = dependencies.insert(
            "stock".to_string(),
            CellImageInfo::new("myorg", "stock", "1.0.0", "Stock Inst"),
        );
        let err = resolve(&model(WITH_CELL_DEP), &info, &ResolveMode::Run { dependencies })
            .unwrap_err();
        assert!(matches!(err, CelleryError::Validation { .. }), "{err}");
        assert!(err.to_string().contains("stock"), "{err}");
    }

    #[test]
    fn scaling_flags_reflect_components() {
        let cell = resolve(
            &model(
                r#"COMPONENT a { image = "a" autoscale = { max = 3 } }
COMPONENT b { image = "b" }"#,
            ),
            &info(),
            &ResolveMode::Build,
        )
        .expect("resolve");
        assert!(cell.auto_scaling_required());
        assert!(!cell.zero_scaling_required());
    }
}
