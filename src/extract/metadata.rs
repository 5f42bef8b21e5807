//! Metadata extraction utilities.

use std::collections::BTreeMap;

use crate::context::{GroupVersionKind, K8sObject};

static EMPTY: BTreeMap<String, String> = BTreeMap::new();

/// Labels of an object; an object without labels yields an empty map.
pub fn labels(obj: &K8sObject) -> &BTreeMap<String, String> {
    obj.metadata().labels.as_ref().unwrap_or(&EMPTY)
}

/// Annotations of an object; an object without annotations yields an empty map.
pub fn annotations(obj: &K8sObject) -> &BTreeMap<String, String> {
    obj.metadata().annotations.as_ref().unwrap_or(&EMPTY)
}

pub fn gvk(obj: &K8sObject) -> GroupVersionKind {
    obj.gvk()
}

/// Check if an object has a specific annotation.
pub fn has_annotation(obj: &K8sObject, key: &str) -> bool {
    annotations(obj).contains_key(key)
}

/// Get an annotation value from an object.
pub fn get_annotation<'a>(obj: &'a K8sObject, key: &str) -> Option<&'a str> {
    annotations(obj).get(key).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::decode::parse_objects;

    #[test]
    fn test_labels_and_annotations() {
        let yaml = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  labels:
    tier: frontend
  annotations:
    owner: team-a
"#;
        let objects = parse_objects(yaml).unwrap();
        let obj = objects[0].k8s_object();
        assert_eq!(labels(obj).get("tier").map(String::as_str), Some("frontend"));
        assert!(has_annotation(obj, "owner"));
        assert_eq!(get_annotation(obj, "owner"), Some("team-a"));
        assert_eq!(get_annotation(obj, "missing"), None);
        assert_eq!(gvk(obj).kind, "Service");
    }

    #[test]
    fn test_missing_maps_are_empty() {
        let objects = parse_objects("apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\n").unwrap();
        assert!(labels(objects[0].k8s_object()).is_empty());
        assert!(annotations(objects[0].k8s_object()).is_empty());
    }
}
