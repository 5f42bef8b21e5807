//! Dangling service template.
//!
//! Cross-object check: a Service is dangling when no pod-template-bearing
//! object in its namespace carries labels matching the service selector.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde::Deserialize;

use crate::context::{K8sObject, LintContext, Object};
use crate::extract;
use crate::objectkinds::SERVICE;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const TEMPLATE_KEY: &str = "dangling-service";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    #[serde(default)]
    ignored_labels: Vec<String>,
}

pub struct DanglingServiceTemplate;

impl Template for DanglingServiceTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Dangling Services"
    }

    fn description(&self) -> &str {
        "Flag services which do not match any application"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[SERVICE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![ParameterDesc::new(
            "ignoredLabels",
            "array",
            "A list of labels that will not cause the check to fail. For example, a label that is known to be populated at runtime by Kubernetes.",
        )]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        Ok(ParsedParams::new(params))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let params: Params = params.downcast(TEMPLATE_KEY)?;
        Ok(Box::new(DanglingServiceCheck {
            ignored_labels: params.ignored_labels,
        }))
    }
}

struct DanglingServiceCheck {
    ignored_labels: Vec<String>,
}

impl CheckFunc for DanglingServiceCheck {
    fn check(&self, ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let K8sObject::Service(service) = object.k8s_object() else {
            return Vec::new();
        };
        let spec = service.spec.as_ref();
        // Selectors do not apply to external names.
        if spec.and_then(|s| s.type_.as_deref()) == Some("ExternalName") {
            return Vec::new();
        }
        let mut selector = spec.and_then(|s| s.selector.clone()).unwrap_or_default();
        if selector.is_empty() {
            return vec![Diagnostic::new("service has no selector specified")];
        }
        for ignored in &self.ignored_labels {
            selector.remove(ignored);
        }

        let label_selector = LabelSelector {
            match_labels: Some(selector),
            match_expressions: None,
        };
        let namespace = object.namespace();
        for candidate in ctx.objects() {
            if candidate.namespace() != namespace {
                continue;
            }
            let Some(template) = extract::pod_template_spec(candidate.k8s_object()) else {
                continue;
            };
            let pod_labels = template
                .metadata
                .as_ref()
                .and_then(|m| m.labels.clone())
                .unwrap_or_default();
            match extract::label_selector_matches(&label_selector, &pod_labels) {
                Ok(true) => return Vec::new(),
                Ok(false) => {}
                Err(e) => {
                    return vec![Diagnostic::new(format!(
                        "service has invalid label selector: {}",
                        e
                    ))];
                }
            }
        }

        let selector = label_selector.match_labels.unwrap_or_default();
        vec![Diagnostic::new(format!(
            "no pods found matching service labels ({})",
            extract::format_labels(&selector)
        ))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::testutil::{compile, messages};

    const WORKLOADS: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: shop
spec:
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
"#;

    fn with_service(service: &str) -> String {
        format!("{}---\n{}", WORKLOADS, service)
    }

    #[test]
    fn test_matching_service() {
        let check = compile(&DanglingServiceTemplate, "");
        let yaml = with_service(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  namespace: shop\nspec:\n  selector:\n    app: web\n",
        );
        let out = messages(check.as_ref(), &yaml);
        assert!(out[1].is_empty());
    }

    #[test]
    fn test_dangling_service() {
        let check = compile(&DanglingServiceTemplate, "");
        let yaml = with_service(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: api\n  namespace: shop\nspec:\n  selector:\n    app: api\n",
        );
        let out = messages(check.as_ref(), &yaml);
        assert_eq!(out[1], vec!["no pods found matching service labels (app=api)"]);
    }

    #[test]
    fn test_other_namespace_does_not_count() {
        let check = compile(&DanglingServiceTemplate, "");
        let yaml = with_service(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  namespace: other\nspec:\n  selector:\n    app: web\n",
        );
        let out = messages(check.as_ref(), &yaml);
        assert_eq!(out[1], vec!["no pods found matching service labels (app=web)"]);
    }

    #[test]
    fn test_no_selector_and_external_name() {
        let check = compile(&DanglingServiceTemplate, "");
        let yaml = with_service(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: bare\nspec:\n  ports: [{port: 80}]\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: ext\nspec:\n  type: ExternalName\n  externalName: example.com\n",
        );
        let out = messages(check.as_ref(), &yaml);
        assert_eq!(out[1], vec!["service has no selector specified"]);
        assert!(out[2].is_empty());
    }

    #[test]
    fn test_ignored_labels() {
        let check = compile(&DanglingServiceTemplate, "ignoredLabels: [revision]");
        let yaml = with_service(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  namespace: shop\nspec:\n  selector:\n    app: web\n    revision: \"7\"\n",
        );
        let out = messages(check.as_ref(), &yaml);
        assert!(out[1].is_empty());
    }
}
