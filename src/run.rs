//! The lint run: every object of every context against every enabled check.

use chrono::Utc;

use crate::checkregistry::{CheckError, CheckRegistry};
use crate::context::LintContext;
use crate::ignore::should_ignore_check;
use crate::instantiated::InstantiatedCheck;
use crate::types::{CheckStatus, LintResult, Report, Summary};

/// Run the named checks over the given contexts.
///
/// Check names are resolved before anything executes, so an unknown name
/// fails the whole run. Reports come back object-major, check-minor, in the
/// order of `contexts`, their objects and `checks`.
pub fn run<'a, C, S>(
    contexts: &'a [C],
    registry: &CheckRegistry,
    checks: &[S],
) -> Result<LintResult<'a>, CheckError>
where
    C: LintContext,
    S: AsRef<str>,
{
    let instantiated: Vec<&InstantiatedCheck> = checks
        .iter()
        .map(|name| {
            let name = name.as_ref();
            registry
                .load(name)
                .ok_or_else(|| CheckError::NotFound(name.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let mut reports = Vec::new();
    let mut objects_analyzed = 0usize;
    for ctx in contexts {
        for obj in ctx.objects() {
            objects_analyzed += 1;
            for check in &instantiated {
                if !check.applies_to(obj) {
                    log::debug!(
                        "skipping {} for {} {}: out of scope",
                        check.name(),
                        obj.kind(),
                        obj.name()
                    );
                    continue;
                }
                if should_ignore_check(obj, check.name()) {
                    log::debug!(
                        "skipping {} for {} {}: ignore annotation",
                        check.name(),
                        obj.kind(),
                        obj.name()
                    );
                    continue;
                }
                reports.extend(check.check(ctx, obj).into_iter().map(|diagnostic| Report {
                    diagnostic,
                    check: check.name().to_string(),
                    remediation: check.remediation().to_string(),
                    object: obj,
                }));
            }
        }
    }

    let checks_status = if reports.is_empty() {
        CheckStatus::Passed
    } else {
        CheckStatus::Failed
    };
    log::info!(
        "lint run finished: {} objects, {} checks, {} reports, status {}",
        objects_analyzed,
        instantiated.len(),
        reports.len(),
        checks_status
    );

    Ok(LintResult {
        checks: instantiated.iter().map(|check| check.spec.clone()).collect(),
        reports,
        summary: Summary {
            checks_status,
            check_end_time: Utc::now(),
            version: crate::VERSION,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckSpec;
    use crate::context::LintContextImpl;
    use crate::context::decode::load_context;
    use crate::objectkinds::ObjectKindRegistry;
    use crate::templates::TemplateRegistry;
    use std::sync::Arc;

    const MANIFESTS: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 1
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
        - name: app
          image: nginx:1.25
          securityContext:
            privileged: true
---
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
---
apiVersion: apps/v1
kind: DaemonSet
metadata:
  name: agent
  annotations:
    ignore-check.kube-linter.io/privileged-container: "node agent"
spec:
  selector:
    matchLabels:
      app: agent
  template:
    metadata:
      labels:
        app: agent
    spec:
      containers:
        - name: agent
          image: agent:2
          securityContext:
            privileged: true
"#;

    fn registry() -> CheckRegistry {
        let mut reg = CheckRegistry::new(
            Arc::new(TemplateRegistry::with_builtin_templates().unwrap()),
            Arc::new(ObjectKindRegistry::with_builtin_kinds()),
        );
        reg.register(&CheckSpec::new(
            "privileged-container",
            "",
            "Do not run your container as privileged unless it is required.",
            "privileged",
        ))
        .unwrap();
        reg.register(
            &CheckSpec::new("minimum-two-replicas", "", "Increase replicas.", "minimum-replicas")
                .with_params(serde_yaml::from_str("minReplicas: 2").unwrap()),
        )
        .unwrap();
        reg
    }

    #[test]
    fn test_run_collects_reports_in_order() {
        let reg = registry();
        let contexts = vec![load_context("manifests.yaml", MANIFESTS)];
        let result = run(
            &contexts,
            &reg,
            &["privileged-container", "minimum-two-replicas"],
        )
        .unwrap();

        let found: Vec<(&str, &str)> = result
            .reports
            .iter()
            .map(|r| (r.check.as_str(), r.object.name()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("privileged-container", "web"),
                ("minimum-two-replicas", "web"),
            ]
        );
        assert_eq!(result.reports[0].diagnostic.message, "container \"app\" is privileged");
        assert_eq!(
            result.reports[0].remediation,
            "Do not run your container as privileged unless it is required."
        );
        assert_eq!(result.summary.checks_status, CheckStatus::Failed);
        assert_eq!(result.summary.version, crate::VERSION);
    }

    #[test]
    fn test_check_order_follows_caller() {
        let reg = registry();
        let contexts = vec![load_context("manifests.yaml", MANIFESTS)];
        let result = run(
            &contexts,
            &reg,
            &["minimum-two-replicas", "privileged-container"],
        )
        .unwrap();
        assert_eq!(result.reports[0].check, "minimum-two-replicas");
        assert_eq!(result.reports[1].check, "privileged-container");

        let ran: Vec<&str> = result.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(ran, vec!["minimum-two-replicas", "privileged-container"]);
        assert_eq!(result.checks[1].template, "privileged");
    }

    #[test]
    fn test_unknown_check_fails_before_running() {
        let reg = registry();
        let contexts = vec![load_context("manifests.yaml", MANIFESTS)];
        let err = run(&contexts, &reg, &["privileged-container", "nope"]).unwrap_err();
        assert_eq!(err.to_string(), "check \"nope\" not found");
    }

    #[test]
    fn test_empty_run_passes() {
        let reg = registry();
        let contexts = vec![LintContextImpl::new()];
        let result = run(&contexts, &reg, &["privileged-container"]).unwrap();
        assert!(result.reports.is_empty());
        assert_eq!(result.summary.checks_status, CheckStatus::Passed);
        assert!(!result.has_failures());
    }
}
