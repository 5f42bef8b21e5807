//! Job spec extraction.

use k8s_openapi::api::batch::v1::JobSpec;
use std::borrow::Cow;

use crate::context::K8sObject;

/// Which kind a job spec was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    /// A standalone Job.
    Job,
    /// The job template of a CronJob.
    CronJob,
}

/// Extract the job spec of a Job or CronJob.
pub fn job_spec(obj: &K8sObject) -> Option<(Cow<'_, JobSpec>, JobSource)> {
    match obj {
        K8sObject::Job(job) => Some((or_default(job.spec.as_ref()), JobSource::Job)),
        K8sObject::CronJob(cron) => Some((
            or_default(
                cron.spec
                    .as_ref()
                    .and_then(|s| s.job_template.spec.as_ref()),
            ),
            JobSource::CronJob,
        )),
        _ => None,
    }
}

fn or_default(spec: Option<&JobSpec>) -> Cow<'_, JobSpec> {
    spec.map(Cow::Borrowed)
        .unwrap_or_else(|| Cow::Owned(JobSpec::default()))
}
