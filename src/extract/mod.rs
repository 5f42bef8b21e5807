//! Extractors for Kubernetes object data.
//!
//! Each extractor answers "does this object have X?" for an arbitrary object.
//! `None` means the concept does not apply to the object's kind; it is never
//! an error. Well-known kinds are handled by explicit per-kind accessors;
//! objects of other kinds are read at a few narrow field paths
//! (`spec.template`, `spec.selector`, `spec.replicas`).

pub mod container;
pub mod job_spec;
pub mod metadata;
pub mod pod_spec;
pub mod replicas;
pub mod selector;
pub mod update_strategy;

pub use container::{all_containers, containers, init_containers};
pub use job_spec::{JobSource, job_spec};
pub use metadata::{annotations, get_annotation, gvk, has_annotation, labels};
pub use pod_spec::{has_pod_spec, pod_spec, pod_template_spec};
pub use replicas::{hpa_min_replicas, replicas};
pub use selector::{
    format_labels, format_selector, is_empty_selector, label_selector_matches, selector,
};
pub use update_strategy::{
    RollingUpdateBounds, UpdateStrategy, int_or_string_to_string, update_strategy,
};
