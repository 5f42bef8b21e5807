//! Lint context for Kubernetes objects.
//!
//! The lint context holds all decoded Kubernetes objects of one input source
//! and provides access to them during check execution.

pub mod decode;
pub mod object;
pub mod openshift;

pub use object::{
    GroupVersionKind, InvalidObject, K8sObject, Object, ObjectMetadata, UnknownObject,
};
pub use openshift::DeploymentConfig;

/// A lint context provides access to all decoded Kubernetes objects.
pub trait LintContext: Send + Sync {
    /// Get all valid objects, in source order.
    fn objects(&self) -> &[Object];

    /// Get all documents that failed to decode.
    fn invalid_objects(&self) -> &[InvalidObject];
}

/// Default implementation of LintContext.
#[derive(Debug, Default)]
pub struct LintContextImpl {
    objects: Vec<Object>,
    invalid_objects: Vec<InvalidObject>,
}

impl LintContextImpl {
    /// Create a new empty lint context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a valid object to the context.
    pub fn add_object(&mut self, object: Object) {
        self.objects.push(object);
    }

    /// Add an invalid object to the context.
    pub fn add_invalid_object(&mut self, invalid: InvalidObject) {
        self.invalid_objects.push(invalid);
    }
}

impl LintContext for LintContextImpl {
    fn objects(&self) -> &[Object] {
        &self.objects
    }

    fn invalid_objects(&self) -> &[InvalidObject] {
        &self.invalid_objects
    }
}

impl FromIterator<Object> for LintContextImpl {
    fn from_iter<I: IntoIterator<Item = Object>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
            invalid_objects: Vec::new(),
        }
    }
}
