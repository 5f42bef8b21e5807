//! PodSpec extraction utilities.

use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use std::borrow::Cow;

use crate::context::K8sObject;

/// Extract the pod template of an object, if its kind carries one.
///
/// A Pod is presented as a template built from its own metadata and spec; a
/// CronJob's template lives under `spec.jobTemplate.spec.template`. Objects of
/// kinds without a typed payload are read at `spec.template`.
pub fn pod_template_spec(obj: &K8sObject) -> Option<Cow<'_, PodTemplateSpec>> {
    match obj {
        K8sObject::Pod(pod) => Some(Cow::Owned(PodTemplateSpec {
            metadata: Some(pod.metadata.clone()),
            spec: pod.spec.clone(),
        })),
        K8sObject::CronJob(cron) => {
            let template = cron
                .spec
                .as_ref()
                .and_then(|s| s.job_template.spec.as_ref())
                .map(|job| &job.template);
            Some(borrowed_or_default(template))
        }
        K8sObject::Deployment(d) => Some(borrowed_or_default(d.spec.as_ref().map(|s| &s.template))),
        K8sObject::StatefulSet(d) => Some(borrowed_or_default(d.spec.as_ref().map(|s| &s.template))),
        K8sObject::DaemonSet(d) => Some(borrowed_or_default(d.spec.as_ref().map(|s| &s.template))),
        K8sObject::Job(d) => Some(borrowed_or_default(d.spec.as_ref().map(|s| &s.template))),
        K8sObject::ReplicaSet(d) => Some(borrowed_or_default(
            d.spec.as_ref().and_then(|s| s.template.as_ref()),
        )),
        K8sObject::ReplicationController(d) => Some(borrowed_or_default(
            d.spec.as_ref().and_then(|s| s.template.as_ref()),
        )),
        K8sObject::DeploymentConfig(d) => Some(borrowed_or_default(d.spec.template.as_ref())),
        K8sObject::HorizontalPodAutoscaler(_) | K8sObject::Service(_) => None,
        K8sObject::Unknown(u) => {
            let template = u.raw.pointer("/spec/template")?;
            serde_json::from_value::<PodTemplateSpec>(template.clone())
                .ok()
                .map(Cow::Owned)
        }
    }
}

/// Extract the PodSpec from a Kubernetes object, if it has one.
pub fn pod_spec(obj: &K8sObject) -> Option<Cow<'_, PodSpec>> {
    match pod_template_spec(obj)? {
        Cow::Borrowed(template) => Some(
            template
                .spec
                .as_ref()
                .map(Cow::Borrowed)
                .unwrap_or_else(|| Cow::Owned(PodSpec::default())),
        ),
        Cow::Owned(template) => Some(Cow::Owned(template.spec.unwrap_or_default())),
    }
}

/// Check if an object has a PodSpec.
pub fn has_pod_spec(obj: &K8sObject) -> bool {
    pod_template_spec(obj).is_some()
}

fn borrowed_or_default<T: Clone + Default>(value: Option<&T>) -> Cow<'_, T> {
    match value {
        Some(v) => Cow::Borrowed(v),
        None => Cow::Owned(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::decode::parse_objects;

    #[test]
    fn test_pod_spec_from_cronjob() {
        let yaml = r#"
apiVersion: batch/v1
kind: CronJob
metadata:
  name: nightly
spec:
  schedule: "0 0 * * *"
  jobTemplate:
    spec:
      template:
        spec:
          restartPolicy: Never
          containers:
          - name: backup
            image: backup:2.1
"#;
        let objects = parse_objects(yaml).unwrap();
        let spec = pod_spec(objects[0].k8s_object()).unwrap();
        assert_eq!(spec.containers.len(), 1);
        assert_eq!(spec.containers[0].name, "backup");
    }

    #[test]
    fn test_pod_is_its_own_template() {
        let yaml = r#"
apiVersion: v1
kind: Pod
metadata:
  name: solo
  labels:
    app: solo
spec:
  containers:
  - name: app
    image: app:1
"#;
        let objects = parse_objects(yaml).unwrap();
        let template = pod_template_spec(objects[0].k8s_object()).unwrap();
        let labels = template.metadata.as_ref().and_then(|m| m.labels.as_ref()).unwrap();
        assert_eq!(labels.get("app").map(String::as_str), Some("solo"));
        assert_eq!(template.spec.as_ref().unwrap().containers[0].name, "app");
    }

    #[test]
    fn test_service_has_no_pod_spec() {
        let yaml = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
"#;
        let objects = parse_objects(yaml).unwrap();
        assert!(pod_spec(objects[0].k8s_object()).is_none());
        assert!(!has_pod_spec(objects[0].k8s_object()));
    }

    #[test]
    fn test_unknown_kind_structural_lookup() {
        let yaml = r#"
apiVersion: argoproj.io/v1alpha1
kind: Rollout
metadata:
  name: canary
spec:
  replicas: 5
  template:
    metadata:
      labels:
        app: canary
    spec:
      containers:
      - name: web
        image: web:3
---
apiVersion: example.com/v1
kind: Widget
metadata:
  name: plain
spec:
  template: "not a pod template"
"#;
        let objects = parse_objects(yaml).unwrap();
        let spec = pod_spec(objects[0].k8s_object()).unwrap();
        assert_eq!(spec.containers[0].image.as_deref(), Some("web:3"));
        assert!(pod_spec(objects[1].k8s_object()).is_none());
    }

    #[test]
    fn test_replicaset_without_template_is_found_empty() {
        let yaml = r#"
apiVersion: apps/v1
kind: ReplicaSet
metadata:
  name: bare
spec:
  selector:
    matchLabels:
      app: bare
"#;
        let objects = parse_objects(yaml).unwrap();
        let spec = pod_spec(objects[0].k8s_object()).unwrap();
        assert!(spec.containers.is_empty());
    }
}
