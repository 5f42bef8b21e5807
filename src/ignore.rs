//! Annotation-based check suppression.
//!
//! `ignore-check.kube-linter.io/<check-name>` disables one check for an
//! object, `ignore-check.kube-linter.io/all` disables every check. The legacy
//! `kube-linter.io/ignore-all` key is honored too. Annotation values are
//! free-form (usually a justification) and never inspected.

use std::collections::BTreeSet;

use crate::context::Object;

/// Prefix for kube-linter ignore annotations.
pub const IGNORE_ANNOTATION_PREFIX: &str = "ignore-check.kube-linter.io/";

pub const IGNORE_ALL_SUFFIX: &str = "all";

pub const LEGACY_IGNORE_ALL_ANNOTATION: &str = "kube-linter.io/ignore-all";

/// Check names suppressed on an object (including the `all` sentinel, if present).
pub fn ignored_checks(obj: &Object) -> BTreeSet<&str> {
    let Some(annotations) = obj.annotations() else {
        return BTreeSet::new();
    };
    let mut ignored: BTreeSet<&str> = annotations
        .keys()
        .filter_map(|key| key.strip_prefix(IGNORE_ANNOTATION_PREFIX))
        .collect();
    if annotations.contains_key(LEGACY_IGNORE_ALL_ANNOTATION) {
        ignored.insert(IGNORE_ALL_SUFFIX);
    }
    ignored
}

/// Whether `check_name` is suppressed for this object.
pub fn should_ignore_check(obj: &Object, check_name: &str) -> bool {
    let Some(annotations) = obj.annotations() else {
        return false;
    };
    annotations.contains_key(LEGACY_IGNORE_ALL_ANNOTATION)
        || annotations.keys().any(|key| {
            key.strip_prefix(IGNORE_ANNOTATION_PREFIX)
                .is_some_and(|suffix| suffix == check_name || suffix == IGNORE_ALL_SUFFIX)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::decode::parse_objects;

    fn object_with_annotations(annotations: &str) -> Object {
        let yaml = format!(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: svc\n  annotations:\n{}",
            annotations
        );
        parse_objects(&yaml).unwrap().remove(0)
    }

    #[test]
    fn test_ignored_checks() {
        let obj = object_with_annotations(
            "    ignore-check.kube-linter.io/privileged-container: \"\"\n    ignore-check.kube-linter.io/latest-tag: reason\n    other-annotation: value\n",
        );
        let ignored = ignored_checks(&obj);
        assert_eq!(
            ignored.into_iter().collect::<Vec<_>>(),
            vec!["latest-tag", "privileged-container"]
        );
    }

    #[test]
    fn test_should_ignore_specific_check() {
        let obj = object_with_annotations(
            "    ignore-check.kube-linter.io/privileged-container: \"\"\n",
        );
        assert!(should_ignore_check(&obj, "privileged-container"));
        assert!(!should_ignore_check(&obj, "latest-tag"));
        assert!(!should_ignore_check(&obj, "Privileged-Container"));
    }

    #[test]
    fn test_ignore_all() {
        let obj = object_with_annotations("    ignore-check.kube-linter.io/all: \"legacy app\"\n");
        assert!(should_ignore_check(&obj, "privileged-container"));
        assert!(should_ignore_check(&obj, "anything"));
    }

    #[test]
    fn test_legacy_ignore_all() {
        let obj = object_with_annotations("    kube-linter.io/ignore-all: \"true\"\n");
        assert!(should_ignore_check(&obj, "latest-tag"));
        assert!(ignored_checks(&obj).contains("all"));
    }

    #[test]
    fn test_no_annotations() {
        let obj = parse_objects("apiVersion: v1\nkind: Service\nmetadata:\n  name: svc\n")
            .unwrap()
            .remove(0);
        assert!(!should_ignore_check(&obj, "latest-tag"));
        assert!(ignored_checks(&obj).is_empty());
    }
}
