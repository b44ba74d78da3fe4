//! Abstract Syntax Tree for `.cell` source files.

/// Root node of a parsed `.cell` file.
#[derive(Debug, Clone, Default)]
pub struct CellFile {
    /// Component definitions in declaration order.
    pub components: Vec<ComponentDecl>,
}

/// A `COMPONENT` block definition.
#[derive(Debug, Clone, Default)]
pub struct ComponentDecl {
    /// Component name.
    pub name: String,
    /// Container image reference.
    pub image: Option<String>,
    /// Local build context; its presence marks the image as locally built.
    pub source: Option<String>,
    /// Container ports in declaration order.
    pub ports: Vec<u16>,
    /// Labels in declaration order.
    pub labels: Vec<(String, String)>,
    /// Environment bindings in declaration order.
    pub env: Vec<EnvDecl>,
    /// Every scaling block written, in order.
    pub scaling: Vec<ScalingDecl>,
    /// `DEPENDS COMPONENT` and `DEPENDS CELL` statements.
    pub depends: Vec<DependsDecl>,
    /// `INGRESS` blocks.
    pub ingresses: Vec<IngressDecl>,
}

/// One `NAME = value` entry of an `env` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvDecl {
    /// Variable name.
    pub name: String,
    /// Declared value.
    pub value: EnvValueDecl,
}

/// Right-hand side of an environment binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValueDecl {
    /// A string literal, possibly containing template tokens.
    Literal(String),
    /// `host(target)`: the service host of a component or dependency cell.
    Host(String),
}

/// An `autoscale` or `scale_to_zero` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalingDecl {
    /// Utilization-based autoscaling.
    Autoscale {
        /// Minimum replicas.
        min: Option<i64>,
        /// Maximum replicas.
        max: Option<i64>,
        /// Resource metrics in declaration order.
        metrics: Vec<MetricDecl>,
        /// Whether deployers may override the policy.
        overridable: Option<bool>,
    },
    /// Concurrency-based scale-to-zero.
    ScaleToZero {
        /// Minimum replicas; only zero is accepted.
        min: Option<i64>,
        /// Maximum replicas.
        max: Option<i64>,
        /// Target concurrent requests per replica.
        concurrency: Option<i64>,
        /// Whether deployers may override the policy.
        overridable: Option<bool>,
    },
}

/// A resource metric inside an `autoscale` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDecl {
    /// Resource name (`cpu` or `memory`).
    pub resource: String,
    /// Declared target.
    pub target: MetricTargetDecl,
}

/// Target of a resource metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricTargetDecl {
    /// A quantity string such as `"500m"`.
    AverageValue(String),
    /// A utilization percentage.
    AverageUtilization(i64),
}

/// A `DEPENDS` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependsDecl {
    /// `DEPENDS COMPONENT name`.
    Component(String),
    /// `DEPENDS CELL alias = "org/name:ver"`.
    Cell {
        /// Alias used by `host()` and the run-time dependency map.
        alias: String,
        /// Image reference text.
        image: String,
    },
}

/// An `INGRESS context { METHOD "path" ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngressDecl {
    /// Context (URL prefix).
    pub context: String,
    /// Whether the API is published beyond the cell.
    pub global: bool,
    /// Method/path pairs in declaration order.
    pub definitions: Vec<(String, String)>,
}
