//! Scaling policy translation.
//!
//! Turns the `autoscale` and `scale_to_zero` blocks of a component into a
//! single [`ScalingPolicy`]. The two shapes are variants of one enum, so a
//! translated component can never carry both.

use cellery_common::constants::{
    AUTO_SCALING_METRIC_RESOURCE_CPU, AUTO_SCALING_METRIC_RESOURCE_MEMORY,
};
use cellery_common::error::{CelleryError, Result};
use serde::{Deserialize, Serialize};

use crate::parser::ast::{MetricDecl, MetricTargetDecl, ScalingDecl};

/// Default minimum replica count of an autoscale policy.
pub const DEFAULT_MIN_REPLICAS: u32 = 1;

/// Scaling policy of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    /// The concrete policy shape.
    pub mode: ScalingMode,
    /// Whether deployers may override the policy.
    pub overridable: bool,
}

/// HPA-shaped or KPA-shaped policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingMode {
    /// Utilization-based autoscaling.
    Autoscale(AutoscalePolicy),
    /// Concurrency-based scale-to-zero.
    ScaleToZero(ZeroScalePolicy),
}

/// HPA-style bounds and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalePolicy {
    /// Minimum replicas.
    pub min_replicas: u32,
    /// Maximum replicas.
    pub max_replicas: u32,
    /// Resource metrics in declaration order.
    pub metrics: Vec<ResourceMetric>,
}

/// KPA-style bounds; the minimum is always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroScalePolicy {
    /// Maximum replicas.
    pub max_replicas: u32,
    /// Target concurrent requests per replica.
    pub concurrency: u32,
}

impl ZeroScalePolicy {
    /// Minimum replicas of a scale-to-zero policy.
    pub const MIN_REPLICAS: u32 = 0;
}

/// A resource metric driving an autoscale policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetric {
    /// Measured resource.
    pub resource: MetricResource,
    /// Target to hold.
    pub target: MetricTarget,
}

/// Resources an autoscale policy can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricResource {
    /// CPU usage.
    Cpu,
    /// Memory usage.
    Memory,
}

impl MetricResource {
    /// Kubernetes resource name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => AUTO_SCALING_METRIC_RESOURCE_CPU,
            Self::Memory => AUTO_SCALING_METRIC_RESOURCE_MEMORY,
        }
    }
}

/// Target value of a resource metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricTarget {
    /// Average quantity per replica, e.g. `"500m"`.
    AverageValue(String),
    /// Average utilization percentage.
    AverageUtilization(u32),
}

impl ScalingPolicy {
    /// Whether this is an HPA-shaped policy.
    #[must_use]
    pub const fn is_autoscale(&self) -> bool {
        matches!(self.mode, ScalingMode::Autoscale(_))
    }

    /// Whether this is a KPA-shaped policy.
    #[must_use]
    pub const fn is_scale_to_zero(&self) -> bool {
        matches!(self.mode, ScalingMode::ScaleToZero(_))
    }
}

/// Translates the scaling blocks declared by `component`.
///
/// Returns `None` when no block was declared.
///
/// # Errors
///
/// Returns [`CelleryError::InvalidScalingPolicy`] if more than one block is
/// declared, a replica bound is missing, negative or inverted, or a metric is
/// repeated or out of range.
pub fn translate(component: &str, decls: &[ScalingDecl]) -> Result<Option<ScalingPolicy>> {
    let decl = match decls {
        [] => return Ok(None),
        [decl] => decl,
        _ => {
            return Err(invalid(
                component,
                "autoscale and scale_to_zero are mutually exclusive and may be declared once",
            ));
        }
    };

    let policy = match decl {
        ScalingDecl::Autoscale {
            min,
            max,
            metrics,
            overridable,
        } => {
            let min_replicas = match min {
                Some(v) => replicas(component, "min", *v)?,
                None => DEFAULT_MIN_REPLICAS,
            };
            let max_replicas = required_max(component, *max)?;
            check_bounds(component, min_replicas, max_replicas)?;
            ScalingPolicy {
                mode: ScalingMode::Autoscale(AutoscalePolicy {
                    min_replicas,
                    max_replicas,
                    metrics: translate_metrics(component, metrics)?,
                }),
                overridable: overridable.unwrap_or(false),
            }
        }
        ScalingDecl::ScaleToZero {
            min,
            max,
            concurrency,
            overridable,
        } => {
            if let Some(v) = min {
                if *v != 0 {
                    return Err(invalid(
                        component,
                        &format!("scale_to_zero requires min = 0, got {v}"),
                    ));
                }
            }
            let max_replicas = required_max(component, *max)?;
            let concurrency = match concurrency {
                Some(v) if *v > 0 => replicas(component, "concurrency", *v)?,
                Some(v) => {
                    return Err(invalid(
                        component,
                        &format!("concurrency must be positive, got {v}"),
                    ));
                }
                None => return Err(invalid(component, "scale_to_zero requires concurrency")),
            };
            ScalingPolicy {
                mode: ScalingMode::ScaleToZero(ZeroScalePolicy {
                    max_replicas,
                    concurrency,
                }),
                overridable: overridable.unwrap_or(false),
            }
        }
    };

    tracing::debug!(
        component,
        autoscale = policy.is_autoscale(),
        overridable = policy.overridable,
        "translated scaling policy"
    );
    Ok(Some(policy))
}

fn translate_metrics(component: &str, metrics: &[MetricDecl]) -> Result<Vec<ResourceMetric>> {
    let mut translated: Vec<ResourceMetric> = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let resource = match metric.resource.as_str() {
            AUTO_SCALING_METRIC_RESOURCE_CPU => MetricResource::Cpu,
            AUTO_SCALING_METRIC_RESOURCE_MEMORY => MetricResource::Memory,
            other => {
                return Err(invalid(component, &format!("unknown metric resource \"{other}\"")));
            }
        };
        if translated.iter().any(|m| m.resource == resource) {
            return Err(invalid(
                component,
                &format!("metric \"{}\" declared twice", resource.as_str()),
            ));
        }
        let target = match &metric.target {
            MetricTargetDecl::AverageValue(v) if !v.trim().is_empty() => {
                MetricTarget::AverageValue(v.clone())
            }
            MetricTargetDecl::AverageValue(_) => {
                return Err(invalid(
                    component,
                    &format!("empty target for metric \"{}\"", resource.as_str()),
                ));
            }
            MetricTargetDecl::AverageUtilization(v) => match u32::try_from(*v) {
                Ok(pct) if pct > 0 => MetricTarget::AverageUtilization(pct),
                _ => {
                    return Err(invalid(
                        component,
                        &format!("utilization target must be positive, got {v}"),
                    ));
                }
            },
        };
        translated.push(ResourceMetric { resource, target });
    }
    Ok(translated)
}

fn required_max(component: &str, max: Option<i64>) -> Result<u32> {
    let max = max.ok_or_else(|| invalid(component, "max replicas must be declared"))?;
    let max = replicas(component, "max", max)?;
    if max == 0 {
        return Err(invalid(component, "max replicas must be at least 1"));
    }
    Ok(max)
}

fn replicas(component: &str, field: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| invalid(component, &format!("{field} out of range: {value}")))
}

fn check_bounds(component: &str, min: u32, max: u32) -> Result<()> {
    if min > max {
        return Err(invalid(
            component,
            &format!("min replicas ({min}) exceed max replicas ({max})"),
        ));
    }
    Ok(())
}

fn invalid(component: &str, message: &str) -> CelleryError {
    CelleryError::InvalidScalingPolicy {
        component: component.into(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn autoscale(min: Option<i64>, max: Option<i64>, metrics: Vec<MetricDecl>) -> ScalingDecl {
        ScalingDecl::Autoscale {
            min,
            max,
            metrics,
            overridable: Some(true),
        }
    }

    fn zero(min: Option<i64>, max: Option<i64>, concurrency: Option<i64>) -> ScalingDecl {
        ScalingDecl::ScaleToZero {
            min,
            max,
            concurrency,
            overridable: None,
        }
    }

    fn metric(resource: &str, target: MetricTargetDecl) -> MetricDecl {
        MetricDecl {
            resource: resource.into(),
            target,
        }
    }

    #[test]
    fn absent_declaration_yields_no_policy() {
        assert_eq!(translate("debug", &[]).expect("translate"), None);
    }

    #[test]
    fn autoscale_preserves_metric_order() {
        let decl = autoscale(
            Some(1),
            Some(10),
            vec![
                metric("cpu", MetricTargetDecl::AverageValue("500m".into())),
                metric("memory", MetricTargetDecl::AverageUtilization(50)),
            ],
        );
        let policy = translate("debug", &[decl]).expect("translate").expect("policy");
        assert!(policy.overridable);
        let ScalingMode::Autoscale(hpa) = policy.mode else {
            panic!("expected autoscale");
        };
        assert_eq!(hpa.min_replicas, 1);
        assert_eq!(hpa.max_replicas, 10);
        assert_eq!(hpa.metrics[0].resource, MetricResource::Cpu);
        assert_eq!(hpa.metrics[0].target, MetricTarget::AverageValue("500m".into()));
        assert_eq!(hpa.metrics[1].resource, MetricResource::Memory);
        assert_eq!(hpa.metrics[1].target, MetricTarget::AverageUtilization(50));
    }

    #[test]
    fn autoscale_min_defaults_to_one() {
        let policy = translate("x", &[autoscale(None, Some(4), Vec::new())])
            .expect("translate")
            .expect("policy");
        let ScalingMode::Autoscale(hpa) = policy.mode else {
            panic!("expected autoscale");
        };
        assert_eq!(hpa.min_replicas, DEFAULT_MIN_REPLICAS);
    }

    #[test]
    fn scale_to_zero_defaults_not_overridable() {
        let policy = translate("pet-service", &[zero(None, Some(10), Some(25))])
            .expect("translate")
            .expect("policy");
        assert!(!policy.overridable);
        assert!(policy.is_scale_to_zero());
        assert_eq!(
            policy.mode,
            ScalingMode::ScaleToZero(ZeroScalePolicy {
                max_replicas: 10,
                concurrency: 25,
            })
        );
    }

    #[test]
    fn both_shapes_are_rejected() {
        let err = translate(
            "x",
            &[
                autoscale(None, Some(3), Vec::new()),
                zero(None, Some(3), Some(1)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CelleryError::InvalidScalingPolicy { .. }));
        assert!(err.to_string().contains("mutually exclusive"), "got: {err}");
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = translate("x", &[autoscale(Some(5), Some(2), Vec::new())]).unwrap_err();
        assert!(err.to_string().contains("exceed"), "got: {err}");
    }

    #[test]
    fn nonzero_min_for_scale_to_zero_is_rejected() {
        let err = translate("x", &[zero(Some(1), Some(2), Some(5))]).unwrap_err();
        assert!(matches!(err, CelleryError::InvalidScalingPolicy { .. }));
    }

    #[test]
    fn missing_concurrency_is_rejected() {
        assert!(translate("x", &[zero(None, Some(2), None)]).is_err());
        assert!(translate("x", &[zero(None, Some(2), Some(0))]).is_err());
    }

    #[test]
    fn missing_or_zero_max_is_rejected() {
        assert!(translate("x", &[autoscale(None, None, Vec::new())]).is_err());
        assert!(translate("x", &[zero(None, Some(0), Some(3))]).is_err());
    }

    #[test]
    fn duplicate_metric_is_rejected() {
        let decl = autoscale(
            None,
            Some(3),
            vec![
                metric("cpu", MetricTargetDecl::AverageUtilization(70)),
                metric("cpu", MetricTargetDecl::AverageValue("200m".into())),
            ],
        );
        let err = translate("x", &[decl]).unwrap_err();
        assert!(err.to_string().contains("twice"), "got: {err}");
    }

    #[test]
    fn negative_replicas_are_rejected() {
        assert!(translate("x", &[autoscale(Some(-1), Some(3), Vec::new())]).is_err());
    }
}
