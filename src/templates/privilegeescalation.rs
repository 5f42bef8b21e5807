//! Privilege escalation template.

use crate::context::{LintContext, Object};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{NoParams, per_container};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const SYS_ADMIN: &str = "SYS_ADMIN";

pub struct PrivilegeEscalationTemplate;

impl Template for PrivilegeEscalationTemplate {
    fn key(&self) -> &str {
        "privilege-escalation-container"
    }

    fn human_name(&self) -> &str {
        "Privilege Escalation on Containers"
    }

    fn description(&self) -> &str {
        "Flag containers of allowing privilege escalation"
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
        Ok(Box::new(|_: &dyn LintContext, object: &Object| {
            per_container(object, |container| -> Option<Diagnostic> {
                let sc = container.security_context.as_ref()?;
                let message = if sc.allow_privilege_escalation == Some(true) {
                    "has AllowPrivilegeEscalation set to true."
                } else if sc.privileged == Some(true) {
                    "is Privileged hence allows privilege escalation."
                } else if sc
                    .capabilities
                    .as_ref()
                    .and_then(|caps| caps.add.as_ref())
                    .is_some_and(|add| add.iter().any(|cap| cap == SYS_ADMIN))
                {
                    "has SYS_ADMIN capability hence allows privilege escalation."
                } else {
                    return None;
                };
                Some(Diagnostic::new(format!("container {:?} {}", container.name, message)))
            })
        }))
    }
}
