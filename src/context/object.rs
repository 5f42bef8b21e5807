//! Kubernetes object representations.
//!
//! Well-known kinds are held as their typed `k8s-openapi` payloads; anything
//! else is kept as an [`UnknownObject`] with its generic field tree so the
//! extraction layer can still probe it structurally.

use k8s_openapi::Resource;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Pod, ReplicationController, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::openshift::DeploymentConfig;

/// Group, version and kind of an object.
///
/// Field names serialize in `PascalCase` (`Group`, `Version`, `Kind`), which is
/// also the shape handed to Lua scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Split an `apiVersion` string (`apps/v1`, or `v1` for the core group).
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// GVK of a typed `k8s-openapi` resource.
    pub fn of<R: Resource>() -> Self {
        Self::new(R::GROUP, R::VERSION, R::KIND)
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
    }
}

/// Metadata about where an object was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// Path of the source file.
    pub file_path: PathBuf,
    /// Raw bytes of the source document.
    #[serde(skip)]
    pub raw: Option<Vec<u8>>,
    /// First line of the document within the source file (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

impl ObjectMetadata {
    /// Create metadata from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
            raw: None,
            line_number: None,
        }
    }

    /// Set the raw bytes.
    pub fn with_raw(mut self, raw: Vec<u8>) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Set the line number.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }
}

/// An object whose kind has no typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownObject {
    pub gvk: GroupVersionKind,
    pub metadata: ObjectMeta,
    /// The full decoded document.
    pub raw: serde_json::Value,
}

/// Kind-specific payload of a decoded object.
#[derive(Debug, Clone, PartialEq)]
pub enum K8sObject {
    Deployment(Box<Deployment>),
    StatefulSet(Box<StatefulSet>),
    DaemonSet(Box<DaemonSet>),
    ReplicaSet(Box<ReplicaSet>),
    ReplicationController(Box<ReplicationController>),
    DeploymentConfig(Box<DeploymentConfig>),
    Pod(Box<Pod>),
    Job(Box<Job>),
    CronJob(Box<CronJob>),
    HorizontalPodAutoscaler(Box<HorizontalPodAutoscaler>),
    Service(Box<Service>),
    Unknown(Box<UnknownObject>),
}

impl K8sObject {
    pub fn gvk(&self) -> GroupVersionKind {
        match self {
            Self::Deployment(_) => GroupVersionKind::of::<Deployment>(),
            Self::StatefulSet(_) => GroupVersionKind::of::<StatefulSet>(),
            Self::DaemonSet(_) => GroupVersionKind::of::<DaemonSet>(),
            Self::ReplicaSet(_) => GroupVersionKind::of::<ReplicaSet>(),
            Self::ReplicationController(_) => GroupVersionKind::of::<ReplicationController>(),
            Self::DeploymentConfig(_) => DeploymentConfig::gvk(),
            Self::Pod(_) => GroupVersionKind::of::<Pod>(),
            Self::Job(_) => GroupVersionKind::of::<Job>(),
            Self::CronJob(_) => GroupVersionKind::of::<CronJob>(),
            Self::HorizontalPodAutoscaler(_) => GroupVersionKind::of::<HorizontalPodAutoscaler>(),
            Self::Service(_) => GroupVersionKind::of::<Service>(),
            Self::Unknown(u) => u.gvk.clone(),
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(d) => &d.metadata,
            Self::StatefulSet(d) => &d.metadata,
            Self::DaemonSet(d) => &d.metadata,
            Self::ReplicaSet(d) => &d.metadata,
            Self::ReplicationController(d) => &d.metadata,
            Self::DeploymentConfig(d) => &d.metadata,
            Self::Pod(d) => &d.metadata,
            Self::Job(d) => &d.metadata,
            Self::CronJob(d) => &d.metadata,
            Self::HorizontalPodAutoscaler(d) => &d.metadata,
            Self::Service(d) => &d.metadata,
            Self::Unknown(d) => &d.metadata,
        }
    }
}

/// A parsed Kubernetes object with metadata.
///
/// The group/version/kind is resolved once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    metadata: ObjectMetadata,
    k8s_object: K8sObject,
    gvk: GroupVersionKind,
}

impl Object {
    /// Create a new object.
    pub fn new(metadata: ObjectMetadata, k8s_object: K8sObject) -> Self {
        let gvk = k8s_object.gvk();
        Self {
            metadata,
            k8s_object,
            gvk,
        }
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    /// Where the object was loaded from.
    pub fn metadata(&self) -> &ObjectMetadata {
        &self.metadata
    }

    /// The decoded payload.
    pub fn k8s_object(&self) -> &K8sObject {
        &self.k8s_object
    }

    pub fn into_k8s_object(self) -> K8sObject {
        self.k8s_object
    }

    pub fn kind(&self) -> &str {
        &self.gvk.kind
    }

    /// Object name, empty if unset.
    pub fn name(&self) -> &str {
        self.k8s_object.metadata().name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.k8s_object.metadata().namespace.as_deref()
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.k8s_object.metadata().labels.as_ref()
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.k8s_object.metadata().annotations.as_ref()
    }

    pub fn file_path(&self) -> &Path {
        &self.metadata.file_path
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Object", 4)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.serialize_field("namespace", self.namespace().unwrap_or(""))?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("gvk", &self.gvk)?;
        state.end()
    }
}

/// An object that failed to decode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidObject {
    pub metadata: ObjectMetadata,
    /// The error that occurred during decoding.
    pub load_err: String,
}

impl InvalidObject {
    pub fn new(metadata: ObjectMetadata, load_err: impl Into<String>) -> Self {
        Self {
            metadata,
            load_err: load_err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gvk_from_api_version() {
        let gvk = GroupVersionKind::from_api_version("apps/v1", "Deployment");
        assert_eq!(gvk, GroupVersionKind::new("apps", "v1", "Deployment"));
        assert_eq!(gvk.api_version(), "apps/v1");

        let core = GroupVersionKind::from_api_version("v1", "Pod");
        assert_eq!(core.group, "");
        assert_eq!(core.version, "v1");
        assert_eq!(core.api_version(), "v1");
    }

    #[test]
    fn test_gvk_display() {
        assert_eq!(
            GroupVersionKind::new("apps", "v1", "Deployment").to_string(),
            "apps/v1, Kind=Deployment"
        );
        assert_eq!(
            GroupVersionKind::new("", "v1", "Pod").to_string(),
            "/v1, Kind=Pod"
        );
    }

    #[test]
    fn test_typed_gvk_matches_resource_consts() {
        assert_eq!(
            GroupVersionKind::of::<Deployment>(),
            GroupVersionKind::new("apps", "v1", "Deployment")
        );
        assert_eq!(
            GroupVersionKind::of::<CronJob>(),
            GroupVersionKind::new("batch", "v1", "CronJob")
        );
        assert_eq!(
            GroupVersionKind::of::<Service>(),
            GroupVersionKind::new("", "v1", "Service")
        );
    }

    #[test]
    fn test_object_accessors() {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "web".to_string());
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web-0".to_string()),
                namespace: Some("prod".to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            ..Default::default()
        };
        let obj = Object::new(
            ObjectMetadata::from_file("pods.yaml").with_line(3),
            K8sObject::Pod(Box::new(pod)),
        );

        assert_eq!(obj.name(), "web-0");
        assert_eq!(obj.namespace(), Some("prod"));
        assert_eq!(obj.kind(), "Pod");
        assert_eq!(obj.labels().and_then(|l| l.get("app")).map(String::as_str), Some("web"));
        assert!(obj.annotations().is_none());
        assert_eq!(obj.metadata().line_number, Some(3));
    }

    #[test]
    fn test_object_serializes_identity_only() {
        let obj = Object::new(
            ObjectMetadata::from_file("svc.yaml").with_raw(b"kind: Service".to_vec()),
            K8sObject::Service(Box::new(Service {
                metadata: ObjectMeta {
                    name: Some("web".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })),
        );

        let json = serde_json::to_value(&obj).unwrap();
        assert_eq!(json["name"], "web");
        assert_eq!(json["namespace"], "");
        assert_eq!(json["gvk"]["Kind"], "Service");
        assert_eq!(json["metadata"]["filePath"], "svc.yaml");
        assert!(json["metadata"].get("raw").is_none());
    }

    #[test]
    fn test_object_equality_and_payload_access() {
        let obj = Object::new(
            ObjectMetadata::from_file("pods.yaml").with_line(7),
            K8sObject::Pod(Box::new(Pod::default())),
        );
        let copy = obj.clone();
        assert_eq!(obj, copy);
        assert_ne!(
            obj,
            Object::new(
                ObjectMetadata::from_file("other.yaml").with_line(7),
                K8sObject::Pod(Box::new(Pod::default())),
            )
        );

        assert_eq!(copy.gvk(), &copy.k8s_object().gvk());
        assert_eq!(copy.metadata().file_path, PathBuf::from("pods.yaml"));
        assert!(matches!(copy.into_k8s_object(), K8sObject::Pod(_)));
    }
}
