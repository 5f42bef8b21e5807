//! HorizontalPodAutoscaler minimum replicas template.

use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::HORIZONTAL_POD_AUTOSCALER;
use crate::templates::replicas::below_minimum;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};

const TEMPLATE_KEY: &str = "hpa-minimum-replicas";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Params {
    pub min_replicas: i32,
}

pub struct HpaMinimumReplicasTemplate;

impl Template for HpaMinimumReplicasTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Minimum replicas for HorizontalPodAutoscaler"
    }

    fn description(&self) -> &str {
        "Flag HorizontalPodAutoscalers whose minReplicas is below the specified value"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[HORIZONTAL_POD_AUTOSCALER]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new(
                "minReplicas",
                "integer",
                "The minimum number of replicas a HorizontalPodAutoscaler should have",
            )
            .required(),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        Ok(ParsedParams::new(params))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let params: Params = params.downcast(TEMPLATE_KEY)?;
        let min_replicas = params.min_replicas;
        Ok(Box::new(move |_: &dyn LintContext, object: &Object| {
            extract::hpa_min_replicas(object.k8s_object())
                .and_then(|replicas| below_minimum(replicas, min_replicas))
                .into_iter()
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::testutil::{compile, messages};

    #[test]
    fn test_hpa_min_replicas() {
        let check = compile(&HpaMinimumReplicasTemplate, "minReplicas: 3");
        let yaml = r#"
apiVersion: autoscaling/v2
kind: HorizontalPodAutoscaler
metadata:
  name: defaulted
spec:
  maxReplicas: 5
  scaleTargetRef: {apiVersion: apps/v1, kind: Deployment, name: web}
---
apiVersion: autoscaling/v2
kind: HorizontalPodAutoscaler
metadata:
  name: two
spec:
  minReplicas: 2
  maxReplicas: 5
  scaleTargetRef: {apiVersion: apps/v1, kind: Deployment, name: web}
---
apiVersion: autoscaling/v2
kind: HorizontalPodAutoscaler
metadata:
  name: enough
spec:
  minReplicas: 3
  maxReplicas: 5
  scaleTargetRef: {apiVersion: apps/v1, kind: Deployment, name: web}
"#;
        let out = messages(check.as_ref(), yaml);
        assert_eq!(out[0], vec!["object has 1 replica but minimum required replicas is 3"]);
        assert_eq!(out[1], vec!["object has 2 replicas but minimum required replicas is 3"]);
        assert!(out[2].is_empty());
    }
}
