//! ttlSecondsAfterFinished template for standalone and managed Jobs.

use crate::context::{LintContext, Object};
use crate::extract::{self, JobSource};
use crate::objectkinds::JOB_LIKE;
use crate::templates::util::NoParams;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const STANDALONE_MESSAGE: &str = "Standalone Job does not specify ttlSecondsAfterFinished";
const MANAGED_MESSAGE: &str = "Managed Job specifies ttlSecondsAfterFinished which might conflict with successfulJobsHistoryLimit and failedJobsHistoryLimit from CronJob that have default values. Final behaviour is determined by the strictest parameter, and therefore, setting ttlSecondsAfterFinished at the job level can result with unexpected behaviour with regard to finished jobs removal";

pub struct JobTtlSecondsAfterFinishedTemplate;

impl Template for JobTtlSecondsAfterFinishedTemplate {
    fn key(&self) -> &str {
        "job-ttl-seconds-after-finished"
    }

    fn human_name(&self) -> &str {
        "ttlSecondsAfterFinished impact for standalone and managed Job objects"
    }

    fn description(&self) -> &str {
        "Flag standalone Job objects not setting ttlSecondsAfterFinished. Flag CronJob objects setting ttlSecondsAfterFinished"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[JOB_LIKE]
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
            let Some((spec, source)) = extract::job_spec(object.k8s_object()) else {
                return Vec::new();
            };
            let ttl_set = spec.ttl_seconds_after_finished.is_some();
            match (source, ttl_set) {
                (JobSource::Job, false) => vec![Diagnostic::new(STANDALONE_MESSAGE)],
                (JobSource::CronJob, true) => vec![Diagnostic::new(MANAGED_MESSAGE)],
                _ => Vec::new(),
            }
        }))
    }
}
