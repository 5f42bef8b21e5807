//! Replica count extraction.

use crate::context::K8sObject;

/// Desired replica count of an object, if its kind carries one.
///
/// Kinds with an optional count default to 1 when it is unset. A
/// DeploymentConfig carries a plain integer that is returned as is. For kinds
/// without a typed payload, `spec.replicas` is read: an explicit `null`
/// defaults to 1, an absent field means the concept does not apply.
pub fn replicas(obj: &K8sObject) -> Option<i32> {
    match obj {
        K8sObject::Deployment(d) => Some(d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1)),
        K8sObject::StatefulSet(d) => Some(d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1)),
        K8sObject::ReplicaSet(d) => Some(d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1)),
        K8sObject::ReplicationController(d) => {
            Some(d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1))
        }
        K8sObject::DeploymentConfig(d) => Some(d.spec.replicas),
        K8sObject::DaemonSet(_)
        | K8sObject::Pod(_)
        | K8sObject::Job(_)
        | K8sObject::CronJob(_)
        | K8sObject::HorizontalPodAutoscaler(_)
        | K8sObject::Service(_) => None,
        K8sObject::Unknown(u) => {
            let spec = u.raw.get("spec")?.as_object()?;
            match spec.get("replicas")? {
                serde_json::Value::Null => Some(1),
                value => value.as_i64().and_then(|n| i32::try_from(n).ok()),
            }
        }
    }
}

/// `spec.minReplicas` of a HorizontalPodAutoscaler, defaulting to 1.
pub fn hpa_min_replicas(obj: &K8sObject) -> Option<i32> {
    match obj {
        K8sObject::HorizontalPodAutoscaler(hpa) => {
            Some(hpa.spec.as_ref().and_then(|s| s.min_replicas).unwrap_or(1))
        }
        _ => None,
    }
}
