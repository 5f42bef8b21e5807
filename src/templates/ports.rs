//! Exposed container port template.

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
    port: i32,
    #[serde(default)]
    protocol: String,
}

struct PortsCheck {
    port: i32,
    protocol: StringMatcher,
}

impl CheckFunc for PortsCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        per_container(object, |container| {
            let mut found = Vec::new();
            for port in container.ports.iter().flatten() {
                let protocol = port.protocol.as_deref().unwrap_or("");
                if port.container_port == self.port && self.protocol.matches(protocol) {
                    found.push(Diagnostic::new(format!(
                        "port {} and protocol {} in container {:?} found",
                        port.container_port, protocol, container.name
                    )));
                }
            }
            found
        })
    }
}

pub struct PortsTemplate;

impl Template for PortsTemplate {
    fn key(&self) -> &str {
        "ports"
    }

    fn human_name(&self) -> &str {
        "Ports"
    }

    fn description(&self) -> &str {
        "Flag containers exposing ports under protocols that match the supplied parameters"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new("port", "integer", "The port.").required(),
            ParameterDesc::new("protocol", "string", "The protocol."),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        let protocol = StringMatcher::new(&params.protocol)
            .map_err(|e| TemplateError::InvalidParams(format!("invalid protocol: {}", e)))?;
        Ok(ParsedParams::new(PortsCheck {
            port: params.port,
            protocol,
        }))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let check: PortsCheck = params.downcast(self.key())?;
        Ok(Box::new(check))
    }
}
