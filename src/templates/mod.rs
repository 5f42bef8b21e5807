//! Check templates.
//!
//! Templates are reusable check implementations that can be configured
//! with parameters to create specific checks. A template decodes its raw
//! parameter bag into a typed parameter struct once, at instantiation time,
//! and compiles it into a [`CheckFunc`].

pub mod antiaffinity;
pub mod capabilities;
pub mod danglingservice;
pub mod disallowedgvk;
pub mod envvar;
pub mod hostmounts;
pub mod hostnamespaces;
pub mod hpareplicas;
pub mod jobttl;
pub mod latesttag;
pub mod luascript;
pub mod mismatchingselector;
pub mod ports;
pub mod privileged;
pub mod privilegeescalation;
pub mod probes;
pub mod readonlyrootfs;
pub mod replicas;
pub mod requiredlabel;
pub mod runasnonroot;
pub mod serviceaccount;
pub mod unsafeprocmount;
pub mod updateconfig;
pub mod util;

use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::context::{LintContext, Object};
use crate::types::Diagnostic;

/// Raw, untyped check parameters as written in configuration.
pub type ParamBag = BTreeMap<String, serde_yaml::Value>;

/// A check function that analyzes a Kubernetes object.
pub trait CheckFunc: Send + Sync {
    /// Run the check on an object and return any diagnostics.
    fn check(&self, ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic>;
}

impl<F> CheckFunc for F
where
    F: Fn(&dyn LintContext, &Object) -> Vec<Diagnostic> + Send + Sync,
{
    fn check(&self, ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        self(ctx, object)
    }
}

/// Parameter description for a template.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDesc {
    /// Parameter name, as written in configuration.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Parameter type (string, boolean, integer, array).
    pub param_type: String,
    /// Whether the parameter is required.
    pub required: bool,
    /// Default value (if any).
    pub default: Option<serde_yaml::Value>,
}

impl ParameterDesc {
    pub fn new(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            param_type: param_type.to_string(),
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<serde_yaml::Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Typed parameters produced by [`Template::parse_and_validate`].
///
/// Opaque to everything but the template that produced it.
pub struct ParsedParams(Box<dyn Any + Send + Sync>);

impl ParsedParams {
    pub fn new<P: Any + Send + Sync>(params: P) -> Self {
        Self(Box::new(params))
    }

    /// Recover the typed parameters. Fails if they were produced by another template.
    pub fn downcast<P: Any>(self, template: &str) -> Result<P, TemplateError> {
        self.0
            .downcast::<P>()
            .map(|p| *p)
            .map_err(|_| TemplateError::ParamsType(template.to_string()))
    }
}

impl std::fmt::Debug for ParsedParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ParsedParams(..)")
    }
}

/// A template for creating checks.
pub trait Template: Send + Sync {
    /// Get the template key (unique identifier).
    fn key(&self) -> &str;

    /// Get the human-readable name.
    fn human_name(&self) -> &str;

    /// Get the template description.
    fn description(&self) -> &str;

    /// Object kind categories the template applies to unless a check overrides its scope.
    fn supported_object_kinds(&self) -> &'static [&'static str];

    /// Get parameter descriptions.
    fn parameters(&self) -> Vec<ParameterDesc>;

    /// Decode and validate a raw parameter bag.
    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError>;

    /// Compile parsed parameters into a check function.
    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError>;
}

/// Template registration and instantiation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("parameters passed to template {0} have an unexpected type")]
    ParamsType(String),

    #[error("template key must not be empty")]
    EmptyKey,

    #[error("duplicate template: {0}")]
    DuplicateTemplate(String),

    #[error("{0}")]
    Instantiate(String),
}

/// Decode a parameter bag into a typed parameter struct.
///
/// Required parameters listed in `descs` are checked first so a missing key
/// reports its name rather than a serde message.
pub fn decode_params<P: DeserializeOwned>(
    descs: &[ParameterDesc],
    params: &ParamBag,
) -> Result<P, TemplateError> {
    if let Some(missing) = descs
        .iter()
        .find(|d| d.required && !params.contains_key(&d.name))
    {
        return Err(TemplateError::MissingParameter(missing.name.clone()));
    }
    let mapping: serde_yaml::Mapping = params
        .iter()
        .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.clone()))
        .collect();
    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
        .map_err(|e| TemplateError::InvalidParams(format!("invalid parameters: {}", e)))
}

/// Catalog of templates, looked up by key when checks are instantiated.
#[derive(Default, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Arc<dyn Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every built-in template.
    pub fn with_builtin_templates() -> Result<Self, TemplateError> {
        let mut registry = Self::new();
        registry.register_all(builtin_templates())?;
        Ok(registry)
    }

    /// Register a template. An empty or already registered key is an error.
    pub fn register(&mut self, template: Arc<dyn Template>) -> Result<(), TemplateError> {
        let key = template.key();
        if key.is_empty() {
            return Err(TemplateError::EmptyKey);
        }
        if self.templates.contains_key(key) {
            return Err(TemplateError::DuplicateTemplate(key.to_string()));
        }
        log::debug!("registered template {}", key);
        self.templates.insert(key.to_string(), template);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        templates: impl IntoIterator<Item = Arc<dyn Template>>,
    ) -> Result<(), TemplateError> {
        for template in templates {
            self.register(template)?;
        }
        Ok(())
    }

    /// Get a template by key.
    pub fn get(&self, key: &str) -> Option<&dyn Template> {
        self.templates.get(key).map(|t| t.as_ref())
    }

    /// All registered templates, sorted by key.
    pub fn list(&self) -> Vec<&dyn Template> {
        self.templates.values().map(|t| t.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Every template shipped with the engine.
pub fn builtin_templates() -> Vec<Arc<dyn Template>> {
    vec![
        Arc::new(antiaffinity::AntiAffinityTemplate),
        Arc::new(replicas::MinimumReplicasTemplate),
        Arc::new(hpareplicas::HpaMinimumReplicasTemplate),
        Arc::new(updateconfig::UpdateConfigurationTemplate),
        Arc::new(latesttag::LatestTagTemplate),
        Arc::new(privileged::PrivilegedTemplate),
        Arc::new(privilegeescalation::PrivilegeEscalationTemplate),
        Arc::new(capabilities::ContainerCapabilitiesTemplate),
        Arc::new(runasnonroot::RunAsNonRootTemplate),
        Arc::new(readonlyrootfs::ReadOnlyRootFsTemplate),
        Arc::new(unsafeprocmount::UnsafeProcMountTemplate),
        Arc::new(hostmounts::HostMountsTemplate),
        Arc::new(hostnamespaces::HostNetworkTemplate),
        Arc::new(hostnamespaces::HostPidTemplate),
        Arc::new(hostnamespaces::HostIpcTemplate),
        Arc::new(probes::LivenessProbeTemplate),
        Arc::new(probes::ReadinessProbeTemplate),
        Arc::new(envvar::EnvVarTemplate),
        Arc::new(ports::PortsTemplate),
        Arc::new(serviceaccount::ServiceAccountTemplate),
        Arc::new(requiredlabel::RequiredLabelTemplate),
        Arc::new(requiredlabel::RequiredAnnotationTemplate),
        Arc::new(mismatchingselector::MismatchingSelectorTemplate),
        Arc::new(danglingservice::DanglingServiceTemplate),
        Arc::new(jobttl::JobTtlSecondsAfterFinishedTemplate),
        Arc::new(disallowedgvk::DisallowedGvkTemplate),
        Arc::new(luascript::LuaScriptTemplate),
    ]
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Helpers shared by the template unit tests.

    use super::*;
    use crate::context::LintContextImpl;
    use crate::context::decode::load_context;

    pub fn bag(yaml: &str) -> ParamBag {
        if yaml.trim().is_empty() {
            return ParamBag::new();
        }
        serde_yaml::from_str(yaml).unwrap()
    }

    pub fn compile(template: &dyn Template, params: &str) -> Box<dyn CheckFunc> {
        let parsed = template.parse_and_validate(&bag(params)).unwrap();
        template.instantiate(parsed).unwrap()
    }

    pub fn context(yaml: &str) -> LintContextImpl {
        load_context("test.yaml", yaml)
    }

    /// Messages produced for every object in `yaml`, in source order.
    pub fn messages(check: &dyn CheckFunc, yaml: &str) -> Vec<Vec<String>> {
        let ctx = context(yaml);
        ctx.objects()
            .iter()
            .map(|o| check.check(&ctx, o).into_iter().map(|d| d.message).collect())
            .collect()
    }
}
