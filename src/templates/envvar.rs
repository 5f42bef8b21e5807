//! Environment variable template.

use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{StringMatcher, per_container};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    name: String,
    #[serde(default)]
    value: String,
}

struct EnvVarCheck {
    name: StringMatcher,
    value: StringMatcher,
}

impl CheckFunc for EnvVarCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        per_container(object, |container| {
            container
                .env
                .iter()
                .flatten()
                .filter(|var| {
                    self.name.matches(&var.name)
                        && self.value.matches(var.value.as_deref().unwrap_or(""))
                })
                .map(|var| {
                    Diagnostic::new(format!(
                        "environment variable {} in container {:?} found",
                        var.name, container.name
                    ))
                })
                .collect::<Vec<_>>()
        })
    }
}

pub struct EnvVarTemplate;

impl Template for EnvVarTemplate {
    fn key(&self) -> &str {
        "env-var"
    }

    fn human_name(&self) -> &str {
        "Environment Variables"
    }

    fn description(&self) -> &str {
        "Flag environment variables that match the provided patterns"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new("name", "string", "The name of the environment variable.").required(),
            ParameterDesc::new("value", "string", "The value of the environment variable."),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        let name = StringMatcher::new(&params.name)
            .map_err(|e| TemplateError::InvalidParams(format!("invalid name: {}", e)))?;
        let value = StringMatcher::new(&params.value)
            .map_err(|e| TemplateError::InvalidParams(format!("invalid value: {}", e)))?;
        Ok(ParsedParams::new(EnvVarCheck { name, value }))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let check: EnvVarCheck = params.downcast(self.key())?;
        Ok(Box::new(check))
    }
}
