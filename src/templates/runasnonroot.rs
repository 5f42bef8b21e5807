//! Run-as-non-root template.
//!
//! Container security context fields override the pod-level ones. A
//! container passes outright when both its effective user and group are
//! explicitly non-zero.

use k8s_openapi::api::core::v1::{PodSecurityContext, SecurityContext};

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::NoParams;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

pub struct RunAsNonRootTemplate;

impl Template for RunAsNonRootTemplate {
    fn key(&self) -> &str {
        "run-as-non-root"
    }

    fn human_name(&self) -> &str {
        "Run as non-root"
    }

    fn description(&self) -> &str {
        "Flag containers set to run as a root user or group"
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
        Ok(Box::new(RunAsNonRootCheck))
    }
}

struct RunAsNonRootCheck;

impl CheckFunc for RunAsNonRootCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let Some(pod_spec) = extract::pod_spec(object.k8s_object()) else {
            return Vec::new();
        };
        let pod_sc = pod_spec.security_context.as_ref();
        let mut diagnostics = Vec::new();

        for container in extract::all_containers(&pod_spec) {
            let sc = container.security_context.as_ref();
            let user = effective(pod_sc, sc, |p| p.run_as_user, |c| c.run_as_user);
            let group = effective(pod_sc, sc, |p| p.run_as_group, |c| c.run_as_group);
            if is_non_zero(user) && is_non_zero(group) {
                continue;
            }

            match group {
                Some(0) => diagnostics.push(Diagnostic::new(format!(
                    "container {:?} has runAsGroup set to 0",
                    container.name
                ))),
                None => diagnostics.push(Diagnostic::new(format!(
                    "container {:?} does not have runAsGroup set",
                    container.name
                ))),
                Some(_) => {}
            }

            let non_root = effective(pod_sc, sc, |p| p.run_as_non_root, |c| c.run_as_non_root)
                .unwrap_or(false);
            if non_root {
                // Rejected by the kubelet at runtime.
                if user == Some(0) {
                    diagnostics.push(Diagnostic::new(format!(
                        "container {:?} is set to runAsNonRoot, but runAsUser set to 0",
                        container.name
                    )));
                }
                continue;
            }
            diagnostics.push(Diagnostic::new(format!(
                "container {:?} is not set to runAsNonRoot",
                container.name
            )));
        }
        diagnostics
    }
}

/// The container's value if set, else the pod's.
fn effective<T>(
    pod: Option<&PodSecurityContext>,
    container: Option<&SecurityContext>,
    from_pod: impl Fn(&PodSecurityContext) -> Option<T>,
    from_container: impl Fn(&SecurityContext) -> Option<T>,
) -> Option<T> {
    container
        .and_then(from_container)
        .or_else(|| pod.and_then(from_pod))
}

fn is_non_zero(id: Option<i64>) -> bool {
    id.is_some_and(|id| id > 0)
}
