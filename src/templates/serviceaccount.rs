//! Service account template.

use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::StringMatcher;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    service_account: String,
}

struct ServiceAccountCheck {
    service_account: StringMatcher,
}

impl CheckFunc for ServiceAccountCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let Some(pod_spec) = extract::pod_spec(object.k8s_object()) else {
            return Vec::new();
        };
        if pod_spec.automount_service_account_token == Some(false) {
            return Vec::new();
        }
        // serviceAccount is the deprecated spelling of serviceAccountName.
        let account = [&pod_spec.service_account_name, &pod_spec.service_account]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .map(String::as_str)
            .unwrap_or("");
        if self.service_account.matches(account) {
            vec![Diagnostic::new(format!(
                "found matching serviceAccount ({:?})",
                account
            ))]
        } else {
            Vec::new()
        }
    }
}

pub struct ServiceAccountTemplate;

impl Template for ServiceAccountTemplate {
    fn key(&self) -> &str {
        "service-account"
    }

    fn human_name(&self) -> &str {
        "Service Account"
    }

    fn description(&self) -> &str {
        "Flag containers which use a matching service account"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new(
                "serviceAccount",
                "string",
                "A regex specifying the service account to match.",
            )
            .required(),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        let service_account = StringMatcher::new(&params.service_account)
            .map_err(|e| TemplateError::InvalidParams(format!("invalid serviceAccount: {}", e)))?;
        Ok(ParsedParams::new(ServiceAccountCheck { service_account }))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let check: ServiceAccountCheck = params.downcast(self.key())?;
        Ok(Box::new(check))
    }
}
