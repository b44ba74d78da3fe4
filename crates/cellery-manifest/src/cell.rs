//! Kubernetes-style `Cell` manifest document.

use std::collections::BTreeMap;

use cellery_common::constants::{
    ANNOTATION_IMAGE_NAME, ANNOTATION_IMAGE_ORG, ANNOTATION_IMAGE_VERSION, CELL_KIND,
    CELLERY_MESH_VERSION, METRIC_TYPE_RESOURCE,
};
use cellery_compose::gateway::GatewayRoute;
use cellery_compose::resolver::{ResolvedCell, ResolvedComponent};
use cellery_compose::scaling::{
    MetricTarget, ResourceMetric, ScalingMode, ScalingPolicy, ZeroScalePolicy,
};
use serde::{Deserialize, Serialize};

/// Root of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Mesh API version.
    pub api_version: String,
    /// Always `Cell`.
    pub kind: String,
    /// Identity and image annotations.
    pub metadata: ObjectMeta,
    /// Gateway and components.
    pub spec: CellSpec,
}

/// Cell identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Declared name at build time, instance name at run time.
    pub name: String,
    /// Image org, name and version annotations.
    pub annotations: BTreeMap<String, String>,
}

/// Cell body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpec {
    /// Gateway template.
    pub gateway: Gateway,
    /// Component templates in declaration order.
    pub components: Vec<Component>,
}

/// Gateway template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    /// Gateway body.
    pub spec: GatewaySpec,
}

/// Gateway body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySpec {
    /// Ingress routing table.
    pub ingress: Ingress,
}

/// Ingress routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingress {
    /// HTTP APIs in declaration order.
    pub http: Vec<HttpApi>,
}

/// One HTTP API behind the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpApi {
    /// URL prefix.
    pub context: String,
    /// Method/path routes.
    pub definitions: Vec<ApiDefinition>,
    /// Backing service.
    pub destination: Destination,
    /// Published beyond the cell.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub global: bool,
}

/// A method/path route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
}

/// Backing service of an API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Component host.
    pub host: String,
    /// Component port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Component template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Component identity.
    pub metadata: ComponentMeta,
    /// Pod template and scaling.
    pub spec: ComponentSpec,
}

/// Component identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMeta {
    /// Component name.
    pub name: String,
    /// Kubernetes labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Component body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Pod template.
    pub template: PodTemplate,
    /// Scaling policy, absent when none was declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_policy: Option<ScalingPolicySpec>,
}

/// Pod template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplate {
    /// Containers; one per component.
    pub containers: Vec<Container>,
}

/// Container of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Image reference.
    pub image: String,
    /// Exposed ports.
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    /// Environment variables.
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

/// An exposed container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port number.
    pub container_port: u16,
}

/// A container environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Resolved value.
    pub value: String,
}

/// Scaling policy of a component; exactly one of `hpa` and `kpa` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicySpec {
    /// HPA-shaped policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpa: Option<Hpa>,
    /// KPA-shaped policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpa: Option<Kpa>,
    /// Whether deployers may override the policy.
    pub overridable: bool,
}

/// HPA-shaped policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hpa {
    /// Minimum replicas.
    pub min_replicas: u32,
    /// Maximum replicas.
    pub max_replicas: u32,
    /// Resource metrics in declaration order.
    pub metrics: Vec<Metric>,
}

/// KPA-shaped policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpa {
    /// Minimum replicas; always zero.
    pub min_replicas: u32,
    /// Maximum replicas.
    pub max_replicas: u32,
    /// Target concurrent requests per replica.
    pub concurrency: u32,
}

/// HPA metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric type; always `Resource`.
    #[serde(rename = "type")]
    pub metric_type: String,
    /// Resource metric source.
    pub resource: MetricResource,
}

/// Resource metric source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResource {
    /// `cpu` or `memory`.
    pub name: String,
    /// Target to hold.
    pub target: MetricTargetSpec,
}

/// Metric target; exactly one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTargetSpec {
    /// Average quantity per replica.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_value: Option<String>,
    /// Average utilization percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_utilization: Option<u32>,
}

impl From<&ResolvedCell> for Cell {
    fn from(cell: &ResolvedCell) -> Self {
        let annotations = [
            (ANNOTATION_IMAGE_ORG, &cell.image.org),
            (ANNOTATION_IMAGE_NAME, &cell.image.name),
            (ANNOTATION_IMAGE_VERSION, &cell.image.ver),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.clone()))
        .collect();

        Self {
            api_version: CELLERY_MESH_VERSION.into(),
            kind: CELL_KIND.into(),
            metadata: ObjectMeta {
                name: cell.name.clone(),
                annotations,
            },
            spec: CellSpec {
                gateway: Gateway {
                    spec: GatewaySpec {
                        ingress: Ingress {
                            http: cell.gateway.iter().map(HttpApi::from).collect(),
                        },
                    },
                },
                components: cell.components.iter().map(Component::from).collect(),
            },
        }
    }
}

impl From<&GatewayRoute> for HttpApi {
    fn from(route: &GatewayRoute) -> Self {
        Self {
            context: route.context.clone(),
            definitions: route
                .definitions
                .iter()
                .map(|d| ApiDefinition {
                    method: d.method.clone(),
                    path: d.path.clone(),
                })
                .collect(),
            destination: Destination {
                host: route.destination_host.clone(),
                port: route.destination_port,
            },
            global: route.global,
        }
    }
}

impl From<&ResolvedComponent> for Component {
    fn from(comp: &ResolvedComponent) -> Self {
        Self {
            metadata: ComponentMeta {
                name: comp.name.clone(),
                labels: comp.labels.clone(),
            },
            spec: ComponentSpec {
                template: PodTemplate {
                    containers: vec![Container {
                        image: comp.image.clone(),
                        ports: comp
                            .ports
                            .iter()
                            .map(|&container_port| ContainerPort { container_port })
                            .collect(),
                        env: comp
                            .env
                            .iter()
                            .map(|(name, value)| EnvVar {
                                name: name.clone(),
                                value: value.clone(),
                            })
                            .collect(),
                    }],
                },
                scaling_policy: comp.scaling.as_ref().map(ScalingPolicySpec::from),
            },
        }
    }
}

impl From<&ScalingPolicy> for ScalingPolicySpec {
    fn from(policy: &ScalingPolicy) -> Self {
        let (hpa, kpa) = match &policy.mode {
            ScalingMode::Autoscale(auto) => (
                Some(Hpa {
                    min_replicas: auto.min_replicas,
                    max_replicas: auto.max_replicas,
                    metrics: auto.metrics.iter().map(Metric::from).collect(),
                }),
                None,
            ),
            ScalingMode::ScaleToZero(zero) => (
                None,
                Some(Kpa {
                    min_replicas: ZeroScalePolicy::MIN_REPLICAS,
                    max_replicas: zero.max_replicas,
                    concurrency: zero.concurrency,
                }),
            ),
        };
        Self {
            hpa,
            kpa,
            overridable: policy.overridable,
        }
    }
}

impl From<&ResourceMetric> for Metric {
    fn from(metric: &ResourceMetric) -> Self {
        let target = match &metric.target {
            MetricTarget::AverageValue(v) => MetricTargetSpec {
                average_value: Some(v.clone()),
                average_utilization: None,
            },
            MetricTarget::AverageUtilization(pct) => MetricTargetSpec {
                average_value: None,
                average_utilization: Some(*pct),
            },
        };
        Self {
            metric_type: METRIC_TYPE_RESOURCE.into(),
            resource: MetricResource {
                name: metric.resource.as_str().into(),
                target,
            },
        }
    }
}
