//! Liveness and readiness probe templates.

use k8s_openapi::api::core::v1::{Container, Probe};

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::NoParams;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

#[derive(Debug, Clone, Copy)]
enum ProbeKind {
    Liveness,
    Readiness,
}

impl ProbeKind {
    fn noun(self) -> &'static str {
        match self {
            Self::Liveness => "liveness",
            Self::Readiness => "readiness",
        }
    }

    fn probe(self, container: &Container) -> Option<&Probe> {
        match self {
            Self::Liveness => container.liveness_probe.as_ref(),
            Self::Readiness => container.readiness_probe.as_ref(),
        }
    }
}

struct MissingProbeCheck(ProbeKind);

impl CheckFunc for MissingProbeCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let Some(pod_spec) = extract::pod_spec(object.k8s_object()) else {
            return Vec::new();
        };
        // Init containers run to completion and are never probed.
        extract::containers(&pod_spec)
            .iter()
            .filter(|container| self.0.probe(container).is_none())
            .map(|container| {
                Diagnostic::new(format!(
                    "container {:?} does not specify a {} probe",
                    container.name,
                    self.0.noun()
                ))
            })
            .collect()
    }
}

fn parse(params: &ParamBag) -> Result<ParsedParams, TemplateError> {
    let params: NoParams = decode_params(&[], params)?;
    Ok(ParsedParams::new(params))
}

/// Template for containers without a liveness probe.
pub struct LivenessProbeTemplate;

impl Template for LivenessProbeTemplate {
    fn key(&self) -> &str {
        "liveness-probe"
    }

    fn human_name(&self) -> &str {
        "Liveness Probe Not Specified"
    }

    fn description(&self) -> &str {
        "Flag containers that don't specify a liveness probe"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        Vec::new()
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        parse(params)
    }

    fn instantiate(&self, _params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        Ok(Box::new(MissingProbeCheck(ProbeKind::Liveness)))
    }
}

/// Template for containers without a readiness probe.
pub struct ReadinessProbeTemplate;

impl Template for ReadinessProbeTemplate {
    fn key(&self) -> &str {
        "readiness-probe"
    }

    fn human_name(&self) -> &str {
        "Readiness Probe Not Specified"
    }

    fn description(&self) -> &str {
        "Flag containers that don't specify a readiness probe"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        Vec::new()
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        parse(params)
    }

    fn instantiate(&self, _params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        Ok(Box::new(MissingProbeCheck(ProbeKind::Readiness)))
    }
}
