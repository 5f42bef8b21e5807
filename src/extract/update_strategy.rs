//! Update strategy extraction.
//!
//! Normalizes `spec.strategy` (Deployment, DeploymentConfig) and
//! `spec.updateStrategy` (DaemonSet, StatefulSet) into one view.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::context::K8sObject;

/// Normalized update strategy of a workload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateStrategy {
    /// Strategy type, empty when unset.
    pub type_: String,
    /// The rolling update block (`rollingUpdate` / `rollingParams`), if defined.
    pub rolling: Option<RollingUpdateBounds>,
}

/// Bounds declared in a rolling update block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingUpdateBounds {
    pub max_unavailable: Option<IntOrString>,
    pub max_surge: Option<IntOrString>,
    /// Whether this kind's rolling block has a `maxSurge` field at all
    /// (StatefulSets do not).
    pub supports_max_surge: bool,
}

/// Extract the update strategy of an object, if its kind carries one.
pub fn update_strategy(obj: &K8sObject) -> Option<UpdateStrategy> {
    match obj {
        K8sObject::Deployment(d) => {
            let strategy = d.spec.as_ref().and_then(|s| s.strategy.as_ref());
            Some(UpdateStrategy {
                type_: strategy.and_then(|s| s.type_.clone()).unwrap_or_default(),
                rolling: strategy
                    .and_then(|s| s.rolling_update.as_ref())
                    .map(|r| RollingUpdateBounds {
                        max_unavailable: r.max_unavailable.clone(),
                        max_surge: r.max_surge.clone(),
                        supports_max_surge: true,
                    }),
            })
        }
        K8sObject::DaemonSet(d) => {
            let strategy = d.spec.as_ref().and_then(|s| s.update_strategy.as_ref());
            Some(UpdateStrategy {
                type_: strategy.and_then(|s| s.type_.clone()).unwrap_or_default(),
                rolling: strategy
                    .and_then(|s| s.rolling_update.as_ref())
                    .map(|r| RollingUpdateBounds {
                        max_unavailable: r.max_unavailable.clone(),
                        max_surge: r.max_surge.clone(),
                        supports_max_surge: true,
                    }),
            })
        }
        K8sObject::StatefulSet(d) => {
            let strategy = d.spec.as_ref().and_then(|s| s.update_strategy.as_ref());
            Some(UpdateStrategy {
                type_: strategy.and_then(|s| s.type_.clone()).unwrap_or_default(),
                rolling: strategy
                    .and_then(|s| s.rolling_update.as_ref())
                    .map(|r| RollingUpdateBounds {
                        max_unavailable: r.max_unavailable.clone(),
                        max_surge: None,
                        supports_max_surge: false,
                    }),
            })
        }
        K8sObject::DeploymentConfig(d) => {
            let strategy = &d.spec.strategy;
            Some(UpdateStrategy {
                type_: strategy.type_.clone().unwrap_or_default(),
                rolling: strategy.rolling_params.as_ref().map(|r| RollingUpdateBounds {
                    max_unavailable: r.max_unavailable.clone(),
                    max_surge: r.max_surge.clone(),
                    supports_max_surge: true,
                }),
            })
        }
        _ => None,
    }
}

/// Render an IntOrString the way it was written (`1`, `25%`).
pub fn int_or_string_to_string(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(i) => i.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::decode::parse_objects;

    #[test]
    fn test_deployment_strategy() {
        let yaml = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  selector: {}
  template: {}
  strategy:
    type: RollingUpdate
    rollingUpdate:
      maxUnavailable: 1
      maxSurge: 25%
"#;
        let objects = parse_objects(yaml).unwrap();
        let strategy = update_strategy(objects[0].k8s_object()).unwrap();
        assert_eq!(strategy.type_, "RollingUpdate");
        let rolling = strategy.rolling.unwrap();
        assert_eq!(rolling.max_unavailable, Some(IntOrString::Int(1)));
        assert_eq!(rolling.max_surge, Some(IntOrString::String("25%".to_string())));
    }

    #[test]
    fn test_statefulset_has_no_surge() {
        let yaml = r#"
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: db
spec:
  serviceName: db
  selector: {}
  template: {}
  updateStrategy:
    type: RollingUpdate
    rollingUpdate:
      partition: 0
"#;
        let objects = parse_objects(yaml).unwrap();
        let rolling = update_strategy(objects[0].k8s_object()).unwrap().rolling.unwrap();
        assert!(!rolling.supports_max_surge);
        assert_eq!(rolling.max_unavailable, None);
    }

    #[test]
    fn test_unset_strategy_and_unsupported_kinds() {
        let yaml = r#"
apiVersion: apps/v1
kind: DaemonSet
metadata:
  name: agent
spec:
  selector: {}
  template: {}
---
apiVersion: batch/v1
kind: Job
metadata:
  name: once
spec:
  template: {}
"#;
        let objects = parse_objects(yaml).unwrap();
        let strategy = update_strategy(objects[0].k8s_object()).unwrap();
        assert_eq!(strategy.type_, "");
        assert!(strategy.rolling.is_none());
        assert!(update_strategy(objects[1].k8s_object()).is_none());
    }

    #[test]
    fn test_int_or_string_rendering() {
        assert_eq!(int_or_string_to_string(&IntOrString::Int(3)), "3");
        assert_eq!(int_or_string_to_string(&IntOrString::String("10%".into())), "10%");
    }
}
