//! Label selector extraction and matching.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::context::K8sObject;

/// Extract the label selector of an object, if its kind carries one.
///
/// An absent selector on a selector-bearing kind yields an empty selector.
/// Kinds with bare label-map selectors (ReplicationController, DeploymentConfig)
/// are converted into `matchLabels`.
pub fn selector(obj: &K8sObject) -> Option<Cow<'_, LabelSelector>> {
    match obj {
        K8sObject::Deployment(d) => Some(borrowed_or_empty(d.spec.as_ref().map(|s| &s.selector))),
        K8sObject::StatefulSet(d) => Some(borrowed_or_empty(d.spec.as_ref().map(|s| &s.selector))),
        K8sObject::DaemonSet(d) => Some(borrowed_or_empty(d.spec.as_ref().map(|s| &s.selector))),
        K8sObject::ReplicaSet(d) => Some(borrowed_or_empty(d.spec.as_ref().map(|s| &s.selector))),
        K8sObject::Job(d) => Some(borrowed_or_empty(
            d.spec.as_ref().and_then(|s| s.selector.as_ref()),
        )),
        K8sObject::CronJob(d) => Some(borrowed_or_empty(
            d.spec
                .as_ref()
                .and_then(|s| s.job_template.spec.as_ref())
                .and_then(|j| j.selector.as_ref()),
        )),
        K8sObject::ReplicationController(d) => Some(from_label_map(
            d.spec.as_ref().and_then(|s| s.selector.as_ref()),
        )),
        K8sObject::DeploymentConfig(d) => Some(from_label_map(d.spec.selector.as_ref())),
        K8sObject::Pod(_) | K8sObject::HorizontalPodAutoscaler(_) | K8sObject::Service(_) => None,
        K8sObject::Unknown(u) => {
            let raw = u.raw.pointer("/spec/selector")?;
            let fields = raw.as_object()?;
            if !fields
                .keys()
                .all(|k| k == "matchLabels" || k == "matchExpressions")
            {
                return None;
            }
            serde_json::from_value::<LabelSelector>(raw.clone())
                .ok()
                .map(Cow::Owned)
        }
    }
}

fn borrowed_or_empty(selector: Option<&LabelSelector>) -> Cow<'_, LabelSelector> {
    match selector {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(LabelSelector::default()),
    }
}

fn from_label_map(labels: Option<&BTreeMap<String, String>>) -> Cow<'static, LabelSelector> {
    Cow::Owned(LabelSelector {
        match_labels: labels.cloned(),
        match_expressions: None,
    })
}

/// A selector with neither `matchLabels` nor `matchExpressions` entries.
pub fn is_empty_selector(selector: &LabelSelector) -> bool {
    selector.match_labels.as_ref().is_none_or(|m| m.is_empty())
        && selector
            .match_expressions
            .as_ref()
            .is_none_or(|e| e.is_empty())
}

/// Evaluate a label selector against a label set.
///
/// Errors on malformed requirements (unknown operator, or a value list that
/// contradicts the operator).
pub fn label_selector_matches(
    selector: &LabelSelector,
    labels: &BTreeMap<String, String>,
) -> Result<bool, String> {
    for requirement in selector.match_expressions.iter().flatten() {
        validate_requirement(requirement)?;
    }

    let labels_match = selector
        .match_labels
        .iter()
        .flatten()
        .all(|(k, v)| labels.get(k) == Some(v));
    if !labels_match {
        return Ok(false);
    }

    Ok(selector
        .match_expressions
        .iter()
        .flatten()
        .all(|r| requirement_matches(r, labels)))
}

fn validate_requirement(requirement: &LabelSelectorRequirement) -> Result<(), String> {
    let values = requirement.values.as_deref().unwrap_or(&[]);
    match requirement.operator.as_str() {
        "In" | "NotIn" if values.is_empty() => Err(format!(
            "values: Invalid value: []: for 'in', 'notin' operators, values set can't be empty (key {})",
            requirement.key
        )),
        "Exists" | "DoesNotExist" if !values.is_empty() => Err(format!(
            "values: Invalid value: {:?}: values set must be empty for exists and does not exist (key {})",
            values, requirement.key
        )),
        "In" | "NotIn" | "Exists" | "DoesNotExist" => Ok(()),
        other => Err(format!("{:?} is not a valid label selector operator", other)),
    }
}

fn requirement_matches(requirement: &LabelSelectorRequirement, labels: &BTreeMap<String, String>) -> bool {
    let values = requirement.values.as_deref().unwrap_or(&[]);
    let actual = labels.get(&requirement.key);
    match requirement.operator.as_str() {
        "In" => actual.is_some_and(|v| values.contains(v)),
        "NotIn" => actual.is_none_or(|v| !values.contains(v)),
        "Exists" => actual.is_some(),
        "DoesNotExist" => actual.is_none(),
        _ => false,
    }
}

/// Render a label set as `k1=v1,k2=v2`.
pub fn format_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a selector in the kubectl selector syntax, requirements sorted by key.
pub fn format_selector(selector: &LabelSelector) -> String {
    let mut parts: Vec<(String, String)> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), format!("{}={}", k, v)))
        .collect();

    for requirement in selector.match_expressions.iter().flatten() {
        let values = requirement.values.as_deref().unwrap_or(&[]);
        let mut sorted = values.to_vec();
        sorted.sort();
        let rendered = match requirement.operator.as_str() {
            "In" => format!("{} in ({})", requirement.key, sorted.join(",")),
            "NotIn" => format!("{} notin ({})", requirement.key, sorted.join(",")),
            "Exists" => requirement.key.clone(),
            "DoesNotExist" => format!("!{}", requirement.key),
            other => format!("{} {} ({})", requirement.key, other, sorted.join(",")),
        };
        parts.push((requirement.key.clone(), rendered));
    }

    parts.sort_by(|a, b| a.0.cmp(&b.0));
    parts
        .into_iter()
        .map(|(_, p)| p)
        .collect::<Vec<_>>()
        .join(",")
}
