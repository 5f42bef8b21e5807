//! Anti-affinity detection template.

use k8s_openapi::api::core::v1::PodAffinityTerm;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{StringMatcher, replicas_noun};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const TEMPLATE_KEY: &str = "anti-affinity";
const DEFAULT_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Params {
    /// Replica count from which anti-affinity is enforced.
    #[serde(default = "default_min_replicas")]
    pub min_replicas: i32,
    /// Topology key matcher; empty means the node hostname key.
    #[serde(default)]
    pub topology_key: String,
}

fn default_min_replicas() -> i32 {
    2
}

/// Template for detecting replicated workloads without pod anti-affinity.
pub struct AntiAffinityTemplate;

impl Template for AntiAffinityTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Anti affinity not specified"
    }

    fn description(&self) -> &str {
        "Flag objects with multiple replicas but inter-pod anti affinity not specified in the pod template spec"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new(
                "minReplicas",
                "integer",
                "The minimum number of replicas a deployment must have before anti-affinity is enforced on it",
            )
            .with_default(2),
            ParameterDesc::new(
                "topologyKey",
                "string",
                "The topology key that the anti-affinity term should use. If not specified, it defaults to \"kubernetes.io/hostname\".",
            ),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        Ok(ParsedParams::new(params))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let params: Params = params.downcast(TEMPLATE_KEY)?;
        let topology_key = if params.topology_key.is_empty() {
            TopologyKeyMatcher::Default
        } else {
            let matcher = StringMatcher::new(&params.topology_key)
                .map_err(|e| TemplateError::Instantiate(e.to_string()))?;
            TopologyKeyMatcher::Custom(matcher)
        };
        Ok(Box::new(AntiAffinityCheck {
            min_replicas: params.min_replicas,
            topology_key,
        }))
    }
}

enum TopologyKeyMatcher {
    Default,
    Custom(StringMatcher),
}

impl TopologyKeyMatcher {
    fn matches(&self, key: &str) -> bool {
        match self {
            Self::Default => key == DEFAULT_TOPOLOGY_KEY,
            Self::Custom(m) => m.matches(key),
        }
    }
}

struct AntiAffinityCheck {
    min_replicas: i32,
    topology_key: TopologyKeyMatcher,
}

impl CheckFunc for AntiAffinityCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let Some(replicas) = extract::replicas(object.k8s_object()) else {
            return Vec::new();
        };
        if replicas < self.min_replicas {
            return Vec::new();
        }
        let Some(template) = extract::pod_template_spec(object.k8s_object()) else {
            return Vec::new();
        };

        let anti_affinity = template
            .spec
            .as_ref()
            .and_then(|s| s.affinity.as_ref())
            .and_then(|a| a.pod_anti_affinity.as_ref());
        let Some(anti_affinity) = anti_affinity else {
            return vec![Diagnostic::new(format!(
                "object has {} {} but does not specify inter pod anti-affinity",
                replicas,
                replicas_noun(replicas)
            ))];
        };

        let preferred = anti_affinity
            .preferred_during_scheduling_ignored_during_execution
            .as_deref()
            .unwrap_or_default();
        let required = anti_affinity
            .required_during_scheduling_ignored_during_execution
            .as_deref()
            .unwrap_or_default();
        if preferred.is_empty() && required.is_empty() {
            return vec![Diagnostic::new(format!(
                "object has {} {} but does not specify preferred or required inter pod anti-affinity during scheduling",
                replicas,
                replicas_noun(replicas)
            ))];
        }

        let namespace = object.namespace().unwrap_or_default();
        let pod_labels = template
            .metadata
            .as_ref()
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();

        // Any one satisfying term is enough.
        let terms = preferred
            .iter()
            .map(|w| &w.pod_affinity_term)
            .chain(required.iter());
        let mut issues = Vec::new();
        for term in terms {
            match self.validate_term(term, namespace, &pod_labels) {
                Ok(()) => return Vec::new(),
                Err(message) => issues.push(Diagnostic::new(message)),
            }
        }
        issues
    }
}

impl AntiAffinityCheck {
    fn validate_term(
        &self,
        term: &PodAffinityTerm,
        pod_namespace: &str,
        pod_labels: &BTreeMap<String, String>,
    ) -> Result<(), String> {
        // No namespaces means the pod's own namespace.
        if let Some(namespaces) = term.namespaces.as_ref().filter(|ns| !ns.is_empty()) {
            if !namespaces.iter().any(|ns| ns == pod_namespace) {
                return Err(format!(
                    "pod's namespace {:?} not found in anti-affinity's namespaces [{}]",
                    pod_namespace,
                    namespaces.join(", ")
                ));
            }
        }

        if !self.topology_key.matches(&term.topology_key) {
            return Err(format!(
                "anti-affinity's topology key does not match {:?}",
                term.topology_key
            ));
        }

        // A term without a selector selects nothing.
        let (matches, rendered) = match &term.label_selector {
            Some(selector) => (
                extract::label_selector_matches(selector, pod_labels)?,
                extract::format_selector(selector),
            ),
            None => (false, String::new()),
        };
        if !matches {
            return Err(format!(
                "pod's labels {:?} do not match with anti-affinity's labels {:?}",
                extract::format_labels(pod_labels),
                rendered
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::testutil::{compile, messages};

    const BASE: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: shop
spec:
  replicas: REPLICAS
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
        - name: web
          image: nginx:1.25
"#;

    fn deployment(replicas: i32, affinity: &str) -> String {
        let mut yaml = BASE.replace("REPLICAS", &replicas.to_string());
        yaml.push_str(affinity);
        yaml
    }

    #[test]
    fn test_missing_anti_affinity() {
        let check = compile(&AntiAffinityTemplate, "");
        let out = messages(check.as_ref(), &deployment(2, ""));
        assert_eq!(
            out,
            vec![vec!["object has 2 replicas but does not specify inter pod anti-affinity".to_string()]]
        );
    }

    #[test]
    fn test_below_min_replicas_passes() {
        let check = compile(&AntiAffinityTemplate, "minReplicas: 3");
        let out = messages(check.as_ref(), &deployment(2, ""));
        assert_eq!(out, vec![Vec::<String>::new()]);
    }

    #[test]
    fn test_empty_anti_affinity() {
        let check = compile(&AntiAffinityTemplate, "");
        let affinity = "      affinity:\n        podAntiAffinity: {}\n";
        let out = messages(check.as_ref(), &deployment(3, affinity));
        assert_eq!(
            out[0],
            vec!["object has 3 replicas but does not specify preferred or required inter pod anti-affinity during scheduling"]
        );
    }

    #[test]
    fn test_matching_required_term() {
        let check = compile(&AntiAffinityTemplate, "");
        let affinity = r#"      affinity:
        podAntiAffinity:
          requiredDuringSchedulingIgnoredDuringExecution:
            - topologyKey: kubernetes.io/hostname
              labelSelector:
                matchLabels:
                  app: web
"#;
        let out = messages(check.as_ref(), &deployment(3, affinity));
        assert!(out[0].is_empty());
    }

    #[test]
    fn test_wrong_topology_key_and_namespace() {
        let check = compile(&AntiAffinityTemplate, "");
        let affinity = r#"      affinity:
        podAntiAffinity:
          preferredDuringSchedulingIgnoredDuringExecution:
            - weight: 100
              podAffinityTerm:
                topologyKey: topology.kubernetes.io/zone
                labelSelector:
                  matchLabels:
                    app: web
          requiredDuringSchedulingIgnoredDuringExecution:
            - topologyKey: kubernetes.io/hostname
              namespaces: [other]
              labelSelector:
                matchLabels:
                  app: web
"#;
        let out = messages(check.as_ref(), &deployment(3, affinity));
        assert_eq!(
            out[0],
            vec![
                "anti-affinity's topology key does not match \"topology.kubernetes.io/zone\"".to_string(),
                "pod's namespace \"shop\" not found in anti-affinity's namespaces [other]".to_string(),
            ]
        );
    }

    #[test]
    fn test_custom_topology_key() {
        let check = compile(&AntiAffinityTemplate, "topologyKey: zone$");
        let affinity = r#"      affinity:
        podAntiAffinity:
          requiredDuringSchedulingIgnoredDuringExecution:
            - topologyKey: topology.kubernetes.io/zone
              labelSelector:
                matchLabels:
                  app: web
"#;
        let out = messages(check.as_ref(), &deployment(2, affinity));
        assert!(out[0].is_empty());
    }

    #[test]
    fn test_invalid_params() {
        let bag = crate::templates::testutil::bag("minReplicas: lots");
        assert!(AntiAffinityTemplate.parse_and_validate(&bag).is_err());
    }
}
