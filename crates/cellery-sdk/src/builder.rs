//! Fluent API for declaring a cell in code.
//!
//! The builders produce the same AST the `.cell` parser does, so a cell
//! built here goes through exactly the same validation, scaling translation
//! and dependency checks.

use cellery_common::error::Result;
use cellery_compose::component::build_model;
use cellery_compose::model::CellModel;
use cellery_compose::parser::ast::{
    CellFile, ComponentDecl, DependsDecl, EnvDecl, EnvValueDecl, IngressDecl, MetricDecl,
    MetricTargetDecl, ScalingDecl,
};

/// Builder for a whole cell.
#[derive(Debug, Default)]
pub struct CellBuilder {
    components: Vec<ComponentDecl>,
}

impl CellBuilder {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component; declaration order is preserved.
    #[must_use]
    pub fn component(mut self, component: ComponentBuilder) -> Self {
        self.components.push(component.decl);
        self
    }

    /// Returns the declared cell as an unvalidated AST.
    #[must_use]
    pub fn into_file(self) -> CellFile {
        CellFile {
            components: self.components,
        }
    }

    /// Validates the cell and builds its model.
    ///
    /// # Errors
    ///
    /// Returns the same errors as building a model from a parsed `.cell` file.
    pub fn build(self) -> Result<CellModel> {
        build_model(&self.into_file())
    }
}

/// Builder for a single component.
#[derive(Debug)]
pub struct ComponentBuilder {
    decl: ComponentDecl,
}

impl ComponentBuilder {
    /// Creates a new builder with the given component name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            decl: ComponentDecl {
                name: name.into(),
                ..ComponentDecl::default()
            },
        }
    }

    /// Sets the container image reference.
    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.decl.image = Some(image.into());
        self
    }

    /// Marks the image as built from a local source directory.
    #[must_use]
    pub fn source(mut self, path: impl Into<String>) -> Self {
        self.decl.source = Some(path.into());
        self
    }

    /// Adds a container port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.decl.ports.push(port);
        self
    }

    /// Adds a label.
    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.decl.labels.push((key.into(), value.into()));
        self
    }

    /// Adds a literal environment variable; `{{instance_name}}` is allowed.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.decl.env.push(EnvDecl {
            name: name.into(),
            value: EnvValueDecl::Literal(value.into()),
        });
        self
    }

    /// Adds an environment variable holding the host of a component or of a
    /// cell dependency alias.
    #[must_use]
    pub fn env_host(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.decl.env.push(EnvDecl {
            name: name.into(),
            value: EnvValueDecl::Host(target.into()),
        });
        self
    }

    /// Declares a dependency on another component of the cell.
    #[must_use]
    pub fn depends_on(mut self, component: impl Into<String>) -> Self {
        self.decl.depends.push(DependsDecl::Component(component.into()));
        self
    }

    /// Declares a dependency on another cell image under `alias`.
    #[must_use]
    pub fn depends_on_cell(mut self, alias: impl Into<String>, image: impl Into<String>) -> Self {
        self.decl.depends.push(DependsDecl::Cell {
            alias: alias.into(),
            image: image.into(),
        });
        self
    }

    /// Adds an autoscale policy with the given replica bounds.
    #[must_use]
    pub fn autoscale(mut self, min: u32, max: u32) -> Self {
        self.decl.scaling.push(ScalingDecl::Autoscale {
            min: Some(i64::from(min)),
            max: Some(i64::from(max)),
            metrics: Vec::new(),
            overridable: None,
        });
        self
    }

    /// Adds an average-value metric to the last autoscale policy.
    #[must_use]
    pub fn average_value(self, resource: impl Into<String>, value: impl Into<String>) -> Self {
        self.metric(resource.into(), MetricTargetDecl::AverageValue(value.into()))
    }

    /// Adds an average-utilization metric to the last autoscale policy.
    #[must_use]
    pub fn average_utilization(self, resource: impl Into<String>, percent: u32) -> Self {
        self.metric(
            resource.into(),
            MetricTargetDecl::AverageUtilization(i64::from(percent)),
        )
    }

    /// Adds a scale-to-zero policy.
    #[must_use]
    pub fn scale_to_zero(mut self, max: u32, concurrency: u32) -> Self {
        self.decl.scaling.push(ScalingDecl::ScaleToZero {
            min: None,
            max: Some(i64::from(max)),
            concurrency: Some(i64::from(concurrency)),
            overridable: None,
        });
        self
    }

    /// Sets whether the last scaling policy may be overridden at deploy time.
    #[must_use]
    pub fn overridable(mut self, value: bool) -> Self {
        match self.decl.scaling.last_mut() {
            Some(
                ScalingDecl::Autoscale { overridable, .. }
                | ScalingDecl::ScaleToZero { overridable, .. },
            ) => *overridable = Some(value),
            None => tracing::warn!(
                component = %self.decl.name,
                "overridable set without a scaling policy; ignored"
            ),
        }
        self
    }

    /// Exposes an API under `context` through the cell gateway.
    #[must_use]
    pub fn ingress(mut self, context: impl Into<String>, definitions: &[(&str, &str)]) -> Self {
        self.decl.ingresses.push(IngressDecl {
            context: context.into(),
            global: false,
            definitions: definitions
                .iter()
                .map(|&(method, path)| (method.to_owned(), path.to_owned()))
                .collect(),
        });
        self
    }

    /// Marks the last API as published beyond the cell.
    #[must_use]
    pub fn global(mut self) -> Self {
        if let Some(ingress) = self.decl.ingresses.last_mut() {
            ingress.global = true;
        }
        self
    }

    fn metric(mut self, resource: String, target: MetricTargetDecl) -> Self {
        let metric = MetricDecl { resource, target };
        match self.decl.scaling.last_mut() {
            Some(ScalingDecl::Autoscale { metrics, .. }) => metrics.push(metric),
            _ => self.decl.scaling.push(ScalingDecl::Autoscale {
                min: None,
                max: None,
                metrics: vec![metric],
                overridable: None,
            }),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use cellery_common::error::CelleryError;
    use cellery_compose::parser::parse_cell;

    use super::*;

    fn employee() -> CellBuilder {
        CellBuilder::new()
            .component(
                ComponentBuilder::new("employee")
                    .image("wso2cellery/sampleapp-employee:0.3.0")
                    .port(8080)
                    .label("team", "HR")
                    .env_host("SALARY_HOST", "salary")
                    .ingress("employee", &[("GET", "/details")]),
            )
            .component(
                ComponentBuilder::new("salary")
                    .image("wso2cellery/sampleapp-salary:0.3.0")
                    .port(8080)
                    .label("team", "Finance")
                    .label("owner", "Alice")
                    .ingress("payroll", &[("GET", "salary")]),
            )
    }

    #[test]
    fn builder_matches_parsed_source() {
        let parsed = build_model(
            &parse_cell(
                r#"
COMPONENT employee {
    image = "wso2cellery/sampleapp-employee:0.3.0"
    port = 8080
    labels = { team = "HR" }
    env = { SALARY_HOST = host(salary) }
    INGRESS employee { GET "/details" }
}
COMPONENT salary {
    image = "wso2cellery/sampleapp-salary:0.3.0"
    port = 8080
    labels = { team = "Finance", owner = "Alice" }
    INGRESS payroll { GET "salary" }
}
"#,
            )
            .expect("parse"),
        )
        .expect("build");
        assert_eq!(employee().build().expect("build"), parsed);
    }

    #[test]
    fn autoscale_metrics_attach_to_policy() {
        let model = CellBuilder::new()
            .component(
                ComponentBuilder::new("debug")
                    .image("docker.io/mirage20/k8s-debug-tools")
                    .autoscale(1, 10)
                    .average_value("cpu", "500m")
                    .average_utilization("memory", 50)
                    .overridable(true),
            )
            .build()
            .expect("build");
        let policy = model.components[0].scaling.as_ref().expect("policy");
        assert!(policy.is_autoscale());
        assert!(policy.overridable);
    }

    #[test]
    fn builder_is_validated() {
        let err = CellBuilder::new()
            .component(ComponentBuilder::new("a").env_host("B", "b"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CelleryError::Validation { .. }));
    }

    #[test]
    fn conflicting_scaling_is_rejected() {
        let err = CellBuilder::new()
            .component(
                ComponentBuilder::new("a")
                    .image("a")
                    .autoscale(1, 2)
                    .scale_to_zero(2, 5),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, CelleryError::InvalidScalingPolicy { .. }));
    }

    #[test]
    fn global_marks_last_ingress() {
        let file = CellBuilder::new()
            .component(
                ComponentBuilder::new("a")
                    .image("a")
                    .ingress("x", &[("GET", "/")])
                    .ingress("y", &[("GET", "/")])
                    .global(),
            )
            .into_file();
        let ingresses = &file.components[0].ingresses;
        assert!(!ingresses[0].global);
        assert!(ingresses[1].global);
    }
}
