//! Container image allow/block list template.

use regex::Regex;
use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::util::{per_container, quoted_patterns};
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const TEMPLATE_KEY: &str = "latest-tag";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    #[serde(default)]
    block_list: Vec<String>,
    #[serde(default)]
    allow_list: Vec<String>,
}

enum ImagePolicy {
    Block(Vec<Regex>),
    Allow(Vec<Regex>),
    Unrestricted,
}

pub struct LatestTagTemplate;

impl Template for LatestTagTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Latest Tag"
    }

    fn description(&self) -> &str {
        "Flag applications running container images that do not satisfies \"allowList\" & \"blockList\" parameters criteria."
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new(
                "blockList",
                "array",
                "list of regular expressions specifying pattern(s) for container images that will be blocked.",
            ),
            ParameterDesc::new(
                "allowList",
                "array",
                "list of regular expressions specifying pattern(s) for container images that will be allowed.",
            ),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        let block = compile_all(&params.block_list)?;
        let allow = compile_all(&params.allow_list)?;
        let policy = match (block.is_empty(), allow.is_empty()) {
            (false, false) => {
                return Err(TemplateError::InvalidParams(
                    "only one of the paramater lists can be used at a time: check has both \"allowList\" & \"blockList\" parameter's values set".to_string(),
                ));
            }
            (false, true) => ImagePolicy::Block(block),
            (true, false) => ImagePolicy::Allow(allow),
            (true, true) => ImagePolicy::Unrestricted,
        };
        Ok(ParsedParams::new(policy))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let policy: ImagePolicy = params.downcast(TEMPLATE_KEY)?;
        Ok(Box::new(policy))
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, TemplateError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| TemplateError::InvalidParams(format!("invalid regex {}: {}", p, e)))
        })
        .collect()
}

impl CheckFunc for ImagePolicy {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        per_container(object, |container| {
            let image = container.image.as_deref().unwrap_or_default();
            match self {
                Self::Block(patterns) if patterns.iter().any(|r| r.is_match(image)) => {
                    Some(Diagnostic::new(format!(
                        "The container {:?} is using an invalid container image, {:?}. Please use images that are not blocked by the `BlockList` criteria : {}",
                        container.name,
                        image,
                        quoted_patterns(patterns)
                    )))
                }
                Self::Allow(patterns) if !patterns.iter().any(|r| r.is_match(image)) => {
                    Some(Diagnostic::new(format!(
                        "The container {:?} is using an invalid container image, {:?}. Please use images that satisfies the `AllowList` criteria : {}",
                        container.name,
                        image,
                        quoted_patterns(patterns)
                    )))
                }
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::testutil::{bag, compile, messages};

    const PODS: &str = r#"
apiVersion: v1
kind: Pod
metadata:
  name: app
spec:
  initContainers:
    - name: init
      image: busybox:latest
  containers:
    - name: app
      image: registry.example.com/app:1.2.3
"#;

    #[test]
    fn test_block_list() {
        let check = compile(&LatestTagTemplate, "blockList: [\".*:(latest)$\"]");
        let out = messages(check.as_ref(), PODS);
        assert_eq!(
            out[0],
            vec![
                "The container \"init\" is using an invalid container image, \"busybox:latest\". Please use images that are not blocked by the `BlockList` criteria : [\".*:(latest)$\"]"
            ]
        );
    }

    #[test]
    fn test_allow_list() {
        let check = compile(&LatestTagTemplate, "allowList: [\"^registry.example.com/\"]");
        let out = messages(check.as_ref(), PODS);
        assert_eq!(out[0].len(), 1);
        assert!(out[0][0].starts_with("The container \"init\""));
        assert!(out[0][0].contains("`AllowList`"));
    }

    #[test]
    fn test_lists_are_exclusive() {
        let err = LatestTagTemplate
            .parse_and_validate(&bag("blockList: [a]\nallowList: [b]\n"))
            .unwrap_err();
        assert!(err.to_string().starts_with("only one of the paramater lists can be used at a time"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = LatestTagTemplate
            .parse_and_validate(&bag("blockList: [\"(\"]"))
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid regex (:"));
    }
}
