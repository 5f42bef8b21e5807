//! Mismatching selector template.

use crate::context::{K8sObject, LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::NoParams;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

pub struct MismatchingSelectorTemplate;

impl Template for MismatchingSelectorTemplate {
    fn key(&self) -> &str {
        "mismatching-selector"
    }

    fn human_name(&self) -> &str {
        "Mismatching Selector"
    }

    fn description(&self) -> &str {
        "Flag deployments where the selector doesn't match the labels in the pod template spec"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        Vec::new()
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: NoParams = decode_params(&self.parameters(), params)?;
        Ok(ParsedParams::new(params))
    }

    fn instantiate(&self, _params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        Ok(Box::new(MismatchingSelectorCheck))
    }
}

struct MismatchingSelectorCheck;

impl CheckFunc for MismatchingSelectorCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let Some(selector) = extract::selector(object.k8s_object()) else {
            return Vec::new();
        };
        if extract::is_empty_selector(&selector) {
            // Jobs get their selector generated by the controller.
            if matches!(object.k8s_object(), K8sObject::Job(_) | K8sObject::CronJob(_)) {
                return Vec::new();
            }
            return vec![Diagnostic::new("object has no selector specified")];
        }

        let Some(template) = extract::pod_template_spec(object.k8s_object()) else {
            return Vec::new();
        };
        let pod_labels = template
            .metadata
            .as_ref()
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();

        match extract::label_selector_matches(&selector, &pod_labels) {
            Ok(true) => Vec::new(),
            Ok(false) => vec![Diagnostic::new(format!(
                "labels in pod spec ({}) do not match labels in selector ({})",
                extract::format_labels(&pod_labels),
                extract::format_selector(&selector)
            ))],
            Err(e) => vec![Diagnostic::new(format!(
                "object has invalid label selector: {}",
                e
            ))],
        }
    }
}
