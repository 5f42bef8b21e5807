//! Privileged container detection template.

use crate::context::{LintContext, Object};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{NoParams, per_container};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

/// Template for detecting privileged containers.
pub struct PrivilegedTemplate;

impl Template for PrivilegedTemplate {
    fn key(&self) -> &str {
        "privileged"
    }

    fn human_name(&self) -> &str {
        "Privileged Containers"
    }

    fn description(&self) -> &str {
        "Flag privileged containers"
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
        Ok(Box::new(PrivilegedCheck))
    }
}

struct PrivilegedCheck;

impl CheckFunc for PrivilegedCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        per_container(object, |container| {
            let privileged = container
                .security_context
                .as_ref()
                .and_then(|sc| sc.privileged)
                .unwrap_or(false);
            privileged.then(|| Diagnostic::new(format!("container {:?} is privileged", container.name)))
        })
    }
}
