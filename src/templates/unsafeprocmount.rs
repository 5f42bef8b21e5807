//! Unsafe /proc mount template.

use crate::context::{LintContext, Object};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{NoParams, per_container};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const UNMASKED: &str = "Unmasked";

pub struct UnsafeProcMountTemplate;

impl Template for UnsafeProcMountTemplate {
    fn key(&self) -> &str {
        "unsafe-proc-mount"
    }

    fn human_name(&self) -> &str {
        "Unsafe Proc Mount"
    }

    fn description(&self) -> &str {
        "Flag containers of unsafe proc mount"
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
            per_container(object, |container| {
                let unmasked = container
                    .security_context
                    .as_ref()
                    .and_then(|sc| sc.proc_mount.as_deref())
                    .is_some_and(|mount| mount.eq_ignore_ascii_case(UNMASKED));
                unmasked.then(|| {
                    Diagnostic::new(format!(
                        "container {:?} exposes /proc unsafely (via procMount=Unmasked).",
                        container.name
                    ))
                })
            })
        }))
    }
}
