//! Sensitive host path mount template.

use regex::Regex;
use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::extract;
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    #[serde(default)]
    dirs: Vec<String>,
}

struct HostMountsCheck {
    dirs: Vec<Regex>,
}

impl CheckFunc for HostMountsCheck {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let Some(pod_spec) = extract::pod_spec(object.k8s_object()) else {
            return Vec::new();
        };
        let containers = extract::all_containers(&pod_spec);
        let mut diagnostics = Vec::new();

        for volume in pod_spec.volumes.iter().flatten() {
            let Some(host_path) = &volume.host_path else {
                continue;
            };
            if !self.dirs.iter().any(|re| re.is_match(&host_path.path)) {
                continue;
            }
            for container in &containers {
                for mount in container.volume_mounts.iter().flatten() {
                    if mount.name == volume.name {
                        diagnostics.push(Diagnostic::new(format!(
                            "host system directory {:?} is mounted on container {:?}",
                            host_path.path, container.name
                        )));
                    }
                }
            }
        }
        diagnostics
    }
}

pub struct HostMountsTemplate;

impl Template for HostMountsTemplate {
    fn key(&self) -> &str {
        "host-mounts"
    }

    fn human_name(&self) -> &str {
        "Host Mounts"
    }

    fn description(&self) -> &str {
        "Flag volume mounts of sensitive system directories"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![ParameterDesc::new(
            "dirs",
            "array",
            "Regular expressions for system directories that must not be mounted, e.g. ^/usr$ for /usr.",
        )]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        let dirs = params
            .dirs
            .iter()
            .map(|dir| {
                Regex::new(dir).map_err(|e| {
                    TemplateError::InvalidParams(format!("invalid regex {}: {}", dir, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ParsedParams::new(HostMountsCheck { dirs }))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let check: HostMountsCheck = params.downcast(self.key())?;
        Ok(Box::new(check))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::testutil::{bag, compile, messages};

    #[test]
    fn test_sensitive_mounts() {
        let yaml = r#"
apiVersion: apps/v1
kind: DaemonSet
metadata:
  name: collector
spec:
  selector:
    matchLabels:
      app: collector
  template:
    metadata:
      labels:
        app: collector
    spec:
      volumes:
        - name: etc
          hostPath:
            path: /etc
        - name: logs
          hostPath:
            path: /var/log
        - name: scratch
          emptyDir: {}
      containers:
        - name: collector
          image: collector:2
          volumeMounts:
            - name: etc
              mountPath: /host/etc
            - name: logs
              mountPath: /host/log
            - name: scratch
              mountPath: /tmp
        - name: idle
          image: pause:3
"#;
        let check = compile(&HostMountsTemplate, "dirs: [\"^/etc$\", \"^/boot$\"]");
        assert_eq!(
            messages(check.as_ref(), yaml)[0],
            vec!["host system directory \"/etc\" is mounted on container \"collector\""]
        );
    }

    #[test]
    fn test_invalid_dir_regex() {
        let err = HostMountsTemplate
            .parse_and_validate(&bag("dirs: [\"(\"]"))
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid regex ("));
    }
}
