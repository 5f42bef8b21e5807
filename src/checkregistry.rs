//! Registry of instantiated checks, keyed by check name.
//!
//! Checks are registered up front; the run loop only ever reads from it.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::CheckSpec;
use crate::instantiated::InstantiatedCheck;
use crate::objectkinds::{MatcherError, ObjectKindRegistry};
use crate::templates::{TemplateError, TemplateRegistry};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("validating check: {}", .errors.join("; "))]
    Validation { name: String, errors: Vec<String> },

    #[error("constructing scope: {0}")]
    Scope(#[from] MatcherError),

    #[error("instantiating check: {0}")]
    Instantiate(TemplateError),

    #[error("invalid check {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: Box<CheckError>,
    },

    #[error("duplicate check name: {0}")]
    Duplicate(String),

    #[error("check {0:?} not found")]
    NotFound(String),

    #[error("{} checks failed to register: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<CheckError>),
}

fn join_errors(errors: &[CheckError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct CheckRegistry {
    templates: Arc<TemplateRegistry>,
    kinds: Arc<ObjectKindRegistry>,
    checks: BTreeMap<String, InstantiatedCheck>,
}

impl CheckRegistry {
    pub fn new(templates: Arc<TemplateRegistry>, kinds: Arc<ObjectKindRegistry>) -> Self {
        Self {
            templates,
            kinds,
            checks: BTreeMap::new(),
        }
    }

    /// Validate, instantiate and store one check. Nothing is stored on failure.
    pub fn register(&mut self, spec: &CheckSpec) -> Result<(), CheckError> {
        let instantiated =
            InstantiatedCheck::validate_and_instantiate(spec, &self.templates, &self.kinds)
                .map_err(|e| CheckError::Invalid {
                    name: spec.name.clone(),
                    source: Box::new(e),
                })?;
        if self.checks.contains_key(instantiated.name()) {
            return Err(CheckError::Duplicate(spec.name.clone()));
        }
        log::debug!(
            "registered check {} (template {}, scope {:?})",
            spec.name,
            spec.template,
            instantiated.matcher().names()
        );
        self.checks.insert(spec.name.clone(), instantiated);
        Ok(())
    }

    /// Register every spec, continuing past failures. All failures come back together.
    pub fn register_all<'a>(
        &mut self,
        specs: impl IntoIterator<Item = &'a CheckSpec>,
    ) -> Result<(), CheckError> {
        let mut errors: Vec<CheckError> = specs
            .into_iter()
            .filter_map(|spec| self.register(spec).err())
            .collect();
        if errors.len() > 1 {
            return Err(CheckError::Multiple(errors));
        }
        errors.pop().map_or(Ok(()), Err)
    }

    pub fn load(&self, name: &str) -> Option<&InstantiatedCheck> {
        self.checks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Registered check names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.checks.keys().map(String::as_str).collect()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("checks", &self.names())
            .finish_non_exhaustive()
    }
}
