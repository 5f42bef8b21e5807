//! Container capabilities template.
//!
//! Every forbidden capability must be dropped and none may be added. The
//! reserved name `all` (any case) in `forbiddenCapabilities` forbids adding
//! anything outside `exceptions` and requires `all` in the drop list.

use k8s_openapi::api::core::v1::Capabilities;
use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{StringMatcher, per_container, quoted_list};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const RESERVED_ALL: &str = "all";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    #[serde(default)]
    forbidden_capabilities: Vec<String>,
    #[serde(default)]
    exceptions: Vec<String>,
}

fn is_all(capability: &str) -> bool {
    capability.eq_ignore_ascii_case(RESERVED_ALL)
}

fn compile(capabilities: &[String]) -> Result<Vec<(String, StringMatcher)>, TemplateError> {
    capabilities
        .iter()
        .map(|cap| {
            StringMatcher::new(cap).map(|m| (cap.clone(), m)).map_err(|e| {
                TemplateError::InvalidParams(format!(
                    "checking container capabilities. invalid capability: {}: {}",
                    cap, e
                ))
            })
        })
        .collect()
}

struct CapabilitiesCheck {
    forbid_all: bool,
    forbidden: Vec<(String, StringMatcher)>,
    exceptions: Vec<StringMatcher>,
}

impl CapabilitiesCheck {
    fn from_params(params: Params) -> Result<Self, TemplateError> {
        let forbid_all = if params.forbidden_capabilities.iter().any(|c| is_all(c)) {
            if params.forbidden_capabilities.len() > 1 {
                return Err(TemplateError::InvalidParams(format!(
                    "forbidden capabilities specified contains {:?}, but it also contains other capabilities: {}. please make sure that it only contains {:?}",
                    RESERVED_ALL,
                    quoted_list(params.forbidden_capabilities.iter().map(String::as_str)),
                    RESERVED_ALL
                )));
            }
            true
        } else {
            false
        };

        if !forbid_all && !params.exceptions.is_empty() {
            return Err(TemplateError::InvalidParams(format!(
                "for verifying container capabilities, \"Exceptions\" list should only be filled when {:?} capabilities specified in the forbidden list",
                RESERVED_ALL
            )));
        }
        if params.exceptions.iter().any(|c| is_all(c)) {
            return Err(TemplateError::InvalidParams(format!(
                "capabilities exceptions list should not contain {:?}",
                RESERVED_ALL
            )));
        }

        let forbidden = if forbid_all {
            Vec::new()
        } else {
            compile(&params.forbidden_capabilities)?
        };
        let exceptions = compile(&params.exceptions)?
            .into_iter()
            .map(|(_, m)| m)
            .collect();
        Ok(Self {
            forbid_all,
            forbidden,
            exceptions,
        })
    }

    fn check_add(&self, name: &str, caps: &Capabilities, out: &mut Vec<Diagnostic>) {
        let added = caps.add.as_deref().unwrap_or(&[]);
        if self.forbid_all {
            for cap in added {
                if !self.exceptions.iter().any(|m| m.matches(cap)) {
                    out.push(Diagnostic::new(format!(
                        "container {:?} has ADD capability: {:?}, but no capabilities should be added at all and this capability is not included in the exceptions list",
                        name, cap
                    )));
                }
            }
            return;
        }
        for (_, matcher) in &self.forbidden {
            for cap in added {
                if matcher.matches(cap) || is_all(cap) {
                    out.push(Diagnostic::new(format!(
                        "container {:?} has ADD capability: {:?}, which matched with the forbidden capability for containers",
                        name, cap
                    )));
                }
            }
        }
    }

    fn check_drop(&self, name: &str, caps: &Capabilities, out: &mut Vec<Diagnostic>) {
        let dropped = caps.drop.as_deref().unwrap_or(&[]);
        let rendered = || quoted_list(dropped.iter().map(String::as_str));
        if self.forbid_all && !dropped.iter().any(|cap| is_all(cap)) {
            out.push(Diagnostic::new(format!(
                "container {:?} has DROP capabilities: {}, but in fact all capabilities are required to be dropped",
                name,
                rendered()
            )));
        }
        for (source, matcher) in &self.forbidden {
            if !dropped.iter().any(|cap| matcher.matches(cap) || is_all(cap)) {
                out.push(Diagnostic::new(format!(
                    "container {:?} has DROP capabilities: {}, but does not drop capability {:?} which is required",
                    name,
                    rendered(),
                    source
                )));
            }
        }
    }
}

impl CheckFunc for CapabilitiesCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        per_container(object, |container| {
            let mut out = Vec::new();
            if let Some(caps) = container
                .security_context
                .as_ref()
                .and_then(|sc| sc.capabilities.as_ref())
            {
                self.check_add(&container.name, caps, &mut out);
                self.check_drop(&container.name, caps, &mut out);
            }
            out
        })
    }
}

pub struct ContainerCapabilitiesTemplate;

impl Template for ContainerCapabilitiesTemplate {
    fn key(&self) -> &str {
        "verify-container-capabilities"
    }

    fn human_name(&self) -> &str {
        "Verify container capabilities"
    }

    fn description(&self) -> &str {
        "Flag containers that do not match capabilities requirements"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new(
                "forbiddenCapabilities",
                "array",
                "Capabilities that must be dropped and never added. \"all\" forbids every capability.",
            ),
            ParameterDesc::new(
                "exceptions",
                "array",
                "Capabilities that may still be added when \"all\" is forbidden.",
            ),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        Ok(ParsedParams::new(CapabilitiesCheck::from_params(params)?))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let check: CapabilitiesCheck = params.downcast(self.key())?;
        Ok(Box::new(check))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::testutil::{bag, compile, messages};

    fn pod(caps: &str) -> String {
        format!(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\nspec:\n  containers:\n    - name: app\n      image: app:1\n      securityContext:\n        capabilities: {caps}\n"
        )
    }

    #[test]
    fn test_forbidden_capability_must_be_dropped() {
        let check = compile(&ContainerCapabilitiesTemplate, "forbiddenCapabilities: [NET_RAW]");
        assert!(messages(check.as_ref(), &pod("{drop: [NET_RAW]}"))[0].is_empty());
        assert!(messages(check.as_ref(), &pod("{drop: [ALL]}"))[0].is_empty());
        assert_eq!(
            messages(check.as_ref(), &pod("{drop: [SYS_TIME], add: [NET_RAW]}"))[0],
            vec![
                "container \"app\" has ADD capability: \"NET_RAW\", which matched with the forbidden capability for containers",
                "container \"app\" has DROP capabilities: [\"SYS_TIME\"], but does not drop capability \"NET_RAW\" which is required",
            ]
        );
    }

    #[test]
    fn test_forbid_all_with_exceptions() {
        let check = compile(
            &ContainerCapabilitiesTemplate,
            "forbiddenCapabilities: [all]\nexceptions: [NET_BIND_SERVICE]",
        );
        assert!(messages(check.as_ref(), &pod("{drop: [all], add: [NET_BIND_SERVICE]}"))[0].is_empty());
        assert_eq!(
            messages(check.as_ref(), &pod("{drop: [NET_RAW], add: [CHOWN]}"))[0],
            vec![
                "container \"app\" has ADD capability: \"CHOWN\", but no capabilities should be added at all and this capability is not included in the exceptions list",
                "container \"app\" has DROP capabilities: [\"NET_RAW\"], but in fact all capabilities are required to be dropped",
            ]
        );
    }

    #[test]
    fn test_no_capabilities_section_passes() {
        let check = compile(&ContainerCapabilitiesTemplate, "forbiddenCapabilities: [NET_RAW]");
        let yaml = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\nspec:\n  containers:\n    - name: app\n      image: app:1\n";
        assert!(messages(check.as_ref(), yaml)[0].is_empty());
    }

    #[test]
    fn test_invalid_params() {
        let t = ContainerCapabilitiesTemplate;
        let err = t
            .parse_and_validate(&bag("forbiddenCapabilities: [all, NET_RAW]"))
            .unwrap_err();
        assert!(err.to_string().contains("it also contains other capabilities"));
        assert!(t
            .parse_and_validate(&bag("forbiddenCapabilities: [NET_RAW]\nexceptions: [CHOWN]"))
            .is_err());
        assert!(t
            .parse_and_validate(&bag("forbiddenCapabilities: [all]\nexceptions: [ALL]"))
            .is_err());
        assert!(t.parse_and_validate(&bag("forbiddenCapabilities: [\"(\"]")).is_err());
    }
}
