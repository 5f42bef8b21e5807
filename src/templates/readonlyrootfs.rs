//! Read-only root filesystem template.

use crate::context::{LintContext, Object};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{NoParams, per_container};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

pub struct ReadOnlyRootFsTemplate;

impl Template for ReadOnlyRootFsTemplate {
    fn key(&self) -> &str {
        "read-only-root-fs"
    }

    fn human_name(&self) -> &str {
        "Read-only Root Filesystems"
    }

    fn description(&self) -> &str {
        "Flag containers without read-only root file systems"
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
        Ok(Box::new(|_: &dyn LintContext, object: &Object| {
            per_container(object, |container| {
                let read_only = container
                    .security_context
                    .as_ref()
                    .and_then(|sc| sc.read_only_root_filesystem)
                    .unwrap_or(false);
                (!read_only).then(|| {
                    Diagnostic::new(format!(
                        "container {:?} does not have a read-only root file system",
                        container.name
                    ))
                })
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::testutil::{compile, messages};

    #[test]
    fn test_writable_root_fs() {
        let yaml = r#"
apiVersion: v1
kind: Pod
metadata:
  name: web
spec:
  containers:
    - name: locked
      image: web:1.0
      securityContext:
        readOnlyRootFilesystem: true
    - name: open
      image: web:1.0
      securityContext:
        readOnlyRootFilesystem: false
    - name: unset
      image: web:1.0
"#;
        let check = compile(&ReadOnlyRootFsTemplate, "");
        assert_eq!(
            messages(check.as_ref(), yaml)[0],
            vec![
                "container \"open\" does not have a read-only root file system",
                "container \"unset\" does not have a read-only root file system",
            ]
        );
    }
}
