//! Minimum replicas template.

use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::replicas_noun;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const TEMPLATE_KEY: &str = "minimum-replicas";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Params {
    pub min_replicas: i32,
}

/// Template for flagging workloads running fewer than a minimum number of replicas.
pub struct MinimumReplicasTemplate;

impl Template for MinimumReplicasTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Minimum replicas"
    }

    fn description(&self) -> &str {
        "Flag applications running fewer than the specified number of replicas"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new(
                "minReplicas",
                "integer",
                "The minimum number of replicas a deployment should have",
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
            extract::replicas(object.k8s_object())
                .and_then(|replicas| below_minimum(replicas, min_replicas))
                .into_iter()
                .collect()
        }))
    }
}

/// Diagnostic for a replica count under `min`, if it is.
pub(crate) fn below_minimum(replicas: i32, min: i32) -> Option<Diagnostic> {
    if replicas >= min {
        return None;
    }
    Some(Diagnostic::new(format!(
        "object has {} {} but minimum required replicas is {}",
        replicas,
        replicas_noun(replicas),
        min
    )))
}
