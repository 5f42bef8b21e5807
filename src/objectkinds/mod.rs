//! Object kind categories and matching.
//!
//! A category is a named predicate over group/version/kind. Checks declare the
//! categories they apply to; [`ObjectKindRegistry::construct_matcher`] compiles a
//! list of category names into a single OR-matcher. Matching never looks at
//! object content.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::context::GroupVersionKind;

pub const ANY: &str = "Any";
pub const DEPLOYMENT_LIKE: &str = "DeploymentLike";
pub const JOB_LIKE: &str = "JobLike";
pub const HORIZONTAL_POD_AUTOSCALER: &str = "HorizontalPodAutoscaler";
pub const SERVICE: &str = "Service";

/// Exact-GVK categories: (name, group, version, kind).
const EXACT_KINDS: &[(&str, &str, &str, &str)] = &[
    ("Deployment", "apps", "v1", "Deployment"),
    ("DaemonSet", "apps", "v1", "DaemonSet"),
    ("StatefulSet", "apps", "v1", "StatefulSet"),
    ("ReplicaSet", "apps", "v1", "ReplicaSet"),
    ("DeploymentConfig", "apps.openshift.io", "v1", "DeploymentConfig"),
    ("Pod", "", "v1", "Pod"),
    ("ReplicationController", "", "v1", "ReplicationController"),
    ("Job", "batch", "v1", "Job"),
    ("CronJob", "batch", "v1", "CronJob"),
    ("Service", "", "v1", "Service"),
    ("ServiceAccount", "", "v1", "ServiceAccount"),
    ("PersistentVolumeClaim", "", "v1", "PersistentVolumeClaim"),
    ("Secret", "", "v1", "Secret"),
    ("ConfigMap", "", "v1", "ConfigMap"),
    ("Ingress", "networking.k8s.io", "v1", "Ingress"),
    ("NetworkPolicy", "networking.k8s.io", "v1", "NetworkPolicy"),
    ("Role", "rbac.authorization.k8s.io", "v1", "Role"),
    ("ClusterRole", "rbac.authorization.k8s.io", "v1", "ClusterRole"),
    ("RoleBinding", "rbac.authorization.k8s.io", "v1", "RoleBinding"),
    ("ClusterRoleBinding", "rbac.authorization.k8s.io", "v1", "ClusterRoleBinding"),
    ("PodDisruptionBudget", "policy", "v1", "PodDisruptionBudget"),
];

/// Group/kind pairs of workloads that own a pod template, matched across versions.
const DEPLOYMENT_LIKE_GROUP_KINDS: &[(&str, &str)] = &[
    ("apps", "Deployment"),
    ("apps", "DaemonSet"),
    ("apps.openshift.io", "DeploymentConfig"),
    ("apps", "StatefulSet"),
    ("apps", "ReplicaSet"),
    ("", "Pod"),
    ("", "ReplicationController"),
    ("batch", "Job"),
    ("batch", "CronJob"),
];

const HPA_VERSIONS: &[&str] = &["v1", "v2", "v2beta1", "v2beta2"];

/// A predicate over group/version/kind.
pub trait KindMatcher: Send + Sync {
    fn matches(&self, gvk: &GroupVersionKind) -> bool;
}

impl<F> KindMatcher for F
where
    F: Fn(&GroupVersionKind) -> bool + Send + Sync,
{
    fn matches(&self, gvk: &GroupVersionKind) -> bool {
        self(gvk)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatcherError {
    #[error("unknown object kind: {0}")]
    UnknownKind(String),

    #[error("duplicate object kind: {0}")]
    Duplicate(String),
}

/// Compiled OR of category predicates.
#[derive(Clone)]
pub struct ObjectKindsMatcher {
    names: Vec<String>,
    matchers: Vec<Arc<dyn KindMatcher>>,
}

impl ObjectKindsMatcher {
    pub fn matches(&self, gvk: &GroupVersionKind) -> bool {
        self.matchers.iter().any(|m| m.matches(gvk))
    }

    /// Category names this matcher was built from.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl fmt::Debug for ObjectKindsMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectKindsMatcher")
            .field("names", &self.names)
            .finish()
    }
}

/// Registry of named object kind categories.
///
/// Populated once before checks are instantiated; read-only afterwards.
#[derive(Default, Clone)]
pub struct ObjectKindRegistry {
    kinds: BTreeMap<String, Arc<dyn KindMatcher>>,
}

impl ObjectKindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `Any`, `DeploymentLike`, `JobLike` and the exact kinds.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_kinds();
        registry
    }

    fn register_builtin_kinds(&mut self) {
        let mut add = |name: &str, matcher: Arc<dyn KindMatcher>| {
            // Built-in names are distinct; a clash would be a table typo.
            debug_assert!(!self.kinds.contains_key(name), "duplicate builtin kind {name}");
            self.kinds.insert(name.to_string(), matcher);
        };

        add(ANY, Arc::new(|_: &GroupVersionKind| true));
        add(DEPLOYMENT_LIKE, Arc::new(is_deployment_like));
        add(
            JOB_LIKE,
            Arc::new(|gvk: &GroupVersionKind| {
                gvk.group == "batch" && gvk.version == "v1" && (gvk.kind == "Job" || gvk.kind == "CronJob")
            }),
        );
        add(
            HORIZONTAL_POD_AUTOSCALER,
            Arc::new(|gvk: &GroupVersionKind| {
                gvk.group == "autoscaling"
                    && gvk.kind == "HorizontalPodAutoscaler"
                    && HPA_VERSIONS.contains(&gvk.version.as_str())
            }),
        );
        for (name, group, version, kind) in EXACT_KINDS {
            let expected = GroupVersionKind::new(*group, *version, *kind);
            add(name, Arc::new(move |gvk: &GroupVersionKind| *gvk == expected));
        }
    }

    /// Register a category. Names are unique within a registry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        matcher: impl KindMatcher + 'static,
    ) -> Result<(), MatcherError> {
        let name = name.into();
        if self.kinds.contains_key(&name) {
            return Err(MatcherError::Duplicate(name));
        }
        log::debug!("registered object kind {}", name);
        self.kinds.insert(name, Arc::new(matcher));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered category names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }

    /// Compile category names into one matcher. Any unknown name fails the whole construction.
    pub fn construct_matcher<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<ObjectKindsMatcher, MatcherError> {
        let mut matchers = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let matcher = self
                .kinds
                .get(name)
                .ok_or_else(|| MatcherError::UnknownKind(name.to_string()))?;
            matchers.push(Arc::clone(matcher));
        }
        Ok(ObjectKindsMatcher {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            matchers,
        })
    }
}

impl fmt::Debug for ObjectKindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectKindRegistry")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Whether a GVK names a pod-template-owning workload (any version).
pub fn is_deployment_like(gvk: &GroupVersionKind) -> bool {
    DEPLOYMENT_LIKE_GROUP_KINDS
        .iter()
        .any(|(group, kind)| gvk.group == *group && gvk.kind == *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gvk(group: &str, version: &str, kind: &str) -> GroupVersionKind {
        GroupVersionKind::new(group, version, kind)
    }

    #[test]
    fn test_any_matches_everything() {
        let registry = ObjectKindRegistry::with_builtin_kinds();
        let matcher = registry.construct_matcher(&[ANY]).unwrap();
        assert!(matcher.matches(&gvk("example.com", "v1", "Widget")));
        assert!(matcher.matches(&gvk("", "", "")));
    }

    #[test]
    fn test_deployment_like() {
        let registry = ObjectKindRegistry::with_builtin_kinds();
        let matcher = registry.construct_matcher(&[DEPLOYMENT_LIKE]).unwrap();
        assert!(matcher.matches(&gvk("apps", "v1", "Deployment")));
        assert!(matcher.matches(&gvk("apps", "v1beta2", "Deployment")));
        assert!(matcher.matches(&gvk("batch", "v1", "CronJob")));
        assert!(matcher.matches(&gvk("apps.openshift.io", "v1", "DeploymentConfig")));
        assert!(!matcher.matches(&gvk("", "v1", "Service")));
        assert!(!matcher.matches(&gvk("extensions", "v1beta1", "Deployment")));
    }

    #[test]
    fn test_exact_kind_and_or_semantics() {
        let registry = ObjectKindRegistry::with_builtin_kinds();
        let matcher = registry.construct_matcher(&["Service", "JobLike"]).unwrap();
        assert!(matcher.matches(&gvk("", "v1", "Service")));
        assert!(matcher.matches(&gvk("batch", "v1", "Job")));
        assert!(!matcher.matches(&gvk("apps", "v1", "Deployment")));
        assert_eq!(matcher.names(), &["Service".to_string(), "JobLike".to_string()]);
    }

    #[test]
    fn test_hpa_versions() {
        let registry = ObjectKindRegistry::with_builtin_kinds();
        let matcher = registry.construct_matcher(&[HORIZONTAL_POD_AUTOSCALER]).unwrap();
        assert!(matcher.matches(&gvk("autoscaling", "v1", "HorizontalPodAutoscaler")));
        assert!(matcher.matches(&gvk("autoscaling", "v2", "HorizontalPodAutoscaler")));
        assert!(!matcher.matches(&gvk("autoscaling", "v3", "HorizontalPodAutoscaler")));
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let registry = ObjectKindRegistry::with_builtin_kinds();
        let err = registry.construct_matcher(&["Deployment", "Gizmo"]).unwrap_err();
        assert_eq!(err, MatcherError::UnknownKind("Gizmo".to_string()));
        assert_eq!(err.to_string(), "unknown object kind: Gizmo");
    }

    #[test]
    fn test_register_custom_and_duplicate() {
        let mut registry = ObjectKindRegistry::with_builtin_kinds();
        registry
            .register("Widget", |gvk: &GroupVersionKind| gvk.kind == "Widget")
            .unwrap();
        let matcher = registry.construct_matcher(&["Widget"]).unwrap();
        assert!(matcher.matches(&gvk("example.com", "v1", "Widget")));

        let err = registry
            .register("Widget", |_: &GroupVersionKind| false)
            .unwrap_err();
        assert_eq!(err, MatcherError::Duplicate("Widget".to_string()));
        assert!(registry.contains("Widget"));
    }

    #[test]
    fn test_empty_scope_matches_nothing() {
        let registry = ObjectKindRegistry::with_builtin_kinds();
        let matcher = registry.construct_matcher::<&str>(&[]).unwrap();
        assert!(!matcher.matches(&gvk("apps", "v1", "Deployment")));
    }
}
