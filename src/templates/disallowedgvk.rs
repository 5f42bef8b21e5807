//! Disallowed API object template.

use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::objectkinds::ANY;
use crate::templates::util::StringMatcher;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const TEMPLATE_KEY: &str = "disallowed-api-obj";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    #[serde(default)]
    group: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    kind: String,
}

struct DisallowedGvk {
    group: StringMatcher,
    version: StringMatcher,
    kind: StringMatcher,
}

pub struct DisallowedGvkTemplate;

impl Template for DisallowedGvkTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Disallowed API Objects"
    }

    fn description(&self) -> &str {
        "Flag disallowed API object kinds"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[ANY]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new("group", "string", "The disallowed object group."),
            ParameterDesc::new("version", "string", "The disallowed object API version."),
            ParameterDesc::new("kind", "string", "The disallowed kind."),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        let compile = |field: &str, expr: &str| {
            StringMatcher::new(expr)
                .map_err(|e| TemplateError::InvalidParams(format!("invalid {}: {}", field, e)))
        };
        Ok(ParsedParams::new(DisallowedGvk {
            group: compile("group", &params.group)?,
            version: compile("version", &params.version)?,
            kind: compile("kind", &params.kind)?,
        }))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let matchers: DisallowedGvk = params.downcast(TEMPLATE_KEY)?;
        Ok(Box::new(matchers))
    }
}

impl CheckFunc for DisallowedGvk {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let gvk = object.gvk();
        if self.group.matches(&gvk.group) && self.version.matches(&gvk.version) && self.kind.matches(&gvk.kind) {
            return vec![Diagnostic::new(format!("disallowed API object found: {}", gvk))];
        }
        Vec::new()
    }
}
