//! Runtime fusion of a check spec with its template.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::checkregistry::CheckError;
use crate::config::CheckSpec;
use crate::context::{LintContext, Object};
use crate::objectkinds::{ObjectKindRegistry, ObjectKindsMatcher};
use crate::templates::{CheckFunc, TemplateRegistry};
use crate::types::Diagnostic;

pub const VALID_CHECK_NAME: &str = "^[a-zA-Z0-9-_]+$";

static VALID_CHECK_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(VALID_CHECK_NAME).expect("check name pattern compiles"));

/// A check ready to run: compiled matcher, compiled check function and the
/// spec it came from. Immutable once built.
pub struct InstantiatedCheck {
    pub spec: CheckSpec,
    matcher: ObjectKindsMatcher,
    func: Box<dyn CheckFunc>,
}

impl InstantiatedCheck {
    /// Validate a spec and compile it against the given registries.
    ///
    /// Name problems and parameter problems are reported together; a missing
    /// template stops validation early since there is nothing to validate
    /// parameters against.
    pub fn validate_and_instantiate(
        spec: &CheckSpec,
        templates: &TemplateRegistry,
        kinds: &ObjectKindRegistry,
    ) -> Result<Self, CheckError> {
        let mut errors = Vec::new();
        if spec.name.is_empty() {
            errors.push("no name specified".to_string());
        }
        if !VALID_CHECK_NAME_REGEX.is_match(&spec.name) {
            errors.push(format!(
                "invalid name {}, must match regex {}",
                spec.name, VALID_CHECK_NAME
            ));
        }

        let Some(template) = templates.get(&spec.template) else {
            errors.push(format!("template {:?} not found", spec.template));
            return Err(CheckError::Validation {
                name: spec.name.clone(),
                errors,
            });
        };

        let params = match template.parse_and_validate(&spec.params) {
            Ok(params) => Some(params),
            Err(e) => {
                errors.push(format!("validating and instantiating params: {}", e));
                None
            }
        };
        let Some(params) = params.filter(|_| errors.is_empty()) else {
            return Err(CheckError::Validation {
                name: spec.name.clone(),
                errors,
            });
        };

        let matcher = match &spec.scope {
            Some(scope) => kinds.construct_matcher(scope.object_kinds.as_slice())?,
            None => kinds.construct_matcher(template.supported_object_kinds())?,
        };
        let func = template
            .instantiate(params)
            .map_err(CheckError::Instantiate)?;

        Ok(Self {
            spec: spec.clone(),
            matcher,
            func,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn remediation(&self) -> &str {
        &self.spec.remediation
    }

    pub fn matcher(&self) -> &ObjectKindsMatcher {
        &self.matcher
    }

    /// Whether the check's scope covers the object's kind.
    pub fn applies_to(&self, object: &Object) -> bool {
        self.matcher.matches(object.gvk())
    }

    pub fn check(&self, ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        self.func.check(ctx, object)
    }
}

impl fmt::Debug for InstantiatedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiatedCheck")
            .field("spec", &self.spec)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}
