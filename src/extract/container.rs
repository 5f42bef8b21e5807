//! Container extraction utilities.

use k8s_openapi::api::core::v1::{Container, EphemeralContainer, PodSpec};
use std::borrow::Cow;

/// All containers of a pod spec: init containers, then regular containers,
/// then ephemeral containers. No reordering, no deduplication.
pub fn all_containers(pod_spec: &PodSpec) -> Vec<Cow<'_, Container>> {
    let mut containers: Vec<Cow<'_, Container>> = init_containers(pod_spec)
        .iter()
        .map(Cow::Borrowed)
        .collect();
    containers.extend(pod_spec.containers.iter().map(Cow::Borrowed));
    containers.extend(
        pod_spec
            .ephemeral_containers
            .iter()
            .flatten()
            .filter_map(ephemeral_as_container)
            .map(Cow::Owned),
    );
    containers
}

/// Extract only regular containers (not init or ephemeral containers).
pub fn containers(pod_spec: &PodSpec) -> &[Container] {
    &pod_spec.containers
}

/// Extract only init containers.
pub fn init_containers(pod_spec: &PodSpec) -> &[Container] {
    pod_spec.init_containers.as_deref().unwrap_or(&[])
}

// Ephemeral containers share the Container field set minus a few lifecycle
// fields, so a serde round trip is a lossless view for checks.
fn ephemeral_as_container(ephemeral: &EphemeralContainer) -> Option<Container> {
    serde_json::to_value(ephemeral)
        .and_then(serde_json::from_value)
        .ok()
}
