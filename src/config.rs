//! Lint configuration: which checks run, plus user-defined checks.
//!
//! The document shape follows kube-linter's `.kube-linter.yaml`:
//!
//! ```yaml
//! checks:
//!   addAllBuiltIn: false
//!   doNotAutoAddDefaults: false
//!   include: [required-label-owner]
//!   exclude: [latest-tag]
//! customChecks:
//!   - name: required-team-annotation
//!     template: required-annotation
//!     params:
//!       key: team
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::checkregistry::{CheckError, CheckRegistry};
use crate::checks::{DEFAULT_CHECKS, builtin_checks};
use crate::templates::ParamBag;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("enabled checks validation: {}", .0.join("; "))]
    EnabledChecks(Vec<String>),

    #[error("check registration: {}", .0.join("; "))]
    CustomChecks(Vec<String>),
}

/// Check selection switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecksConfig {
    /// Enable every built-in check; pair with `exclude` to opt out of some.
    #[serde(default, rename = "addAllBuiltIn")]
    pub add_all_built_in: bool,

    #[serde(default)]
    pub do_not_auto_add_defaults: bool,

    /// Names to enable. A name in both `include` and `exclude` stays excluded.
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintConfig {
    #[serde(default)]
    pub checks: ChecksConfig,

    #[serde(default)]
    pub custom_checks: Vec<CheckSpec>,
}

impl LintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, check: impl Into<String>) -> Self {
        self.checks.include.push(check.into());
        self
    }

    pub fn exclude(mut self, check: impl Into<String>) -> Self {
        self.checks.exclude.push(check.into());
        self
    }

    pub fn with_all_built_in(mut self) -> Self {
        self.checks.add_all_built_in = true;
        self
    }

    pub fn without_defaults(mut self) -> Self {
        self.checks.do_not_auto_add_defaults = true;
        self
    }

    pub fn with_custom_check(mut self, spec: CheckSpec) -> Self {
        self.custom_checks.push(spec);
        self
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document decodes to null; treat it as the default config.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&content)
    }
}

/// A check definition: a named, configured instance of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub remediation: String,

    /// Key of the template this check instantiates.
    pub template: String,

    /// Template parameters, decoded by the template itself.
    #[serde(default)]
    pub params: ParamBag,

    /// Overrides the template's default scope when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ObjectKindsDesc>,
}

impl CheckSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        remediation: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            remediation: remediation.into(),
            template: template.into(),
            params: ParamBag::new(),
            scope: None,
        }
    }

    pub fn with_params(mut self, params: ParamBag) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_scope(mut self, scope: ObjectKindsDesc) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Object-kind category names a check applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectKindsDesc {
    #[serde(default)]
    pub object_kinds: Vec<String>,
}

impl ObjectKindsDesc {
    pub fn new(kinds: &[&str]) -> Self {
        Self {
            object_kinds: kinds.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Register the config's custom checks. Every failure is collected; the
/// checks that did validate stay registered.
pub fn register_custom_checks(
    config: &LintConfig,
    registry: &mut CheckRegistry,
) -> Result<(), ConfigError> {
    let errors: Vec<String> = config
        .custom_checks
        .iter()
        .filter_map(|spec| {
            registry
                .register(spec)
                .err()
                .map(|e: CheckError| format!("failed to register custom check {}: {}", spec.name, e))
        })
        .collect();
    if !errors.is_empty() {
        return Err(ConfigError::CustomChecks(errors));
    }
    Ok(())
}

/// Resolve the set of enabled check names, sorted.
///
/// Defaults (unless suppressed), every built-in when requested, custom checks
/// and `include` are added, then `exclude` is removed. Every remaining name
/// must be registered.
pub fn resolve_enabled_checks(
    config: &LintConfig,
    registry: &CheckRegistry,
) -> Result<Vec<String>, ConfigError> {
    let mut enabled: BTreeSet<String> = BTreeSet::new();
    if !config.checks.do_not_auto_add_defaults {
        enabled.extend(DEFAULT_CHECKS.iter().map(|c| c.to_string()));
    }
    if config.checks.add_all_built_in {
        enabled.extend(builtin_checks().into_iter().map(|c| c.name));
    }
    enabled.extend(config.custom_checks.iter().map(|c| c.name.clone()));
    enabled.extend(config.checks.include.iter().cloned());
    for name in &config.checks.exclude {
        enabled.remove(name);
    }

    let missing: Vec<String> = enabled
        .iter()
        .filter(|name| !registry.contains(name))
        .map(|name| format!("check {:?} not found", name))
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::EnabledChecks(missing));
    }
    Ok(enabled.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::register_builtin_checks;
    use crate::objectkinds::ObjectKindRegistry;
    use crate::templates::TemplateRegistry;
    use std::io::Write;
    use std::sync::Arc;

    fn builtin_registry() -> CheckRegistry {
        let mut reg = CheckRegistry::new(
            Arc::new(TemplateRegistry::with_builtin_templates().unwrap()),
            Arc::new(ObjectKindRegistry::with_builtin_kinds()),
        );
        register_builtin_checks(&mut reg).unwrap();
        reg
    }

    #[test]
    fn test_default_config() {
        let config = LintConfig::default();
        assert!(!config.checks.add_all_built_in);
        assert!(!config.checks.do_not_auto_add_defaults);
        assert!(config.custom_checks.is_empty());
        assert!(LintConfig::load_from_str("").unwrap().checks.include.is_empty());
    }

    #[test]
    fn test_load_from_str() {
        let yaml = r#"
checks:
  addAllBuiltIn: true
  exclude:
    - latest-tag
  include:
    - required-team
customChecks:
  - name: required-team
    template: required-label
    params:
      key: team
    scope:
      objectKinds:
        - DeploymentLike
"#;
        let config = LintConfig::load_from_str(yaml).unwrap();
        assert!(config.checks.add_all_built_in);
        assert_eq!(config.checks.exclude, vec!["latest-tag"]);
        let custom = &config.custom_checks[0];
        assert_eq!(custom.template, "required-label");
        assert_eq!(custom.params["key"], serde_yaml::Value::from("team"));
        assert_eq!(custom.scope, Some(ObjectKindsDesc::new(&["DeploymentLike"])));
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let err = LintConfig::load_from_str("checks: [1, 2]").unwrap_err();
        assert!(err.to_string().starts_with("parsing config:"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "checks:\n  doNotAutoAddDefaults: true").unwrap();
        let config = LintConfig::load_from_file(file.path()).unwrap();
        assert!(config.checks.do_not_auto_add_defaults);

        let err = LintConfig::load_from_file("/nonexistent/.kube-linter.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_resolve_defaults() {
        let reg = builtin_registry();
        let enabled = resolve_enabled_checks(&LintConfig::new(), &reg).unwrap();
        let mut expected: Vec<String> = DEFAULT_CHECKS.iter().map(|c| c.to_string()).collect();
        expected.sort();
        assert_eq!(enabled, expected);
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let reg = builtin_registry();
        let config = LintConfig::new()
            .without_defaults()
            .include("latest-tag")
            .include("privileged-container")
            .exclude("latest-tag");
        let enabled = resolve_enabled_checks(&config, &reg).unwrap();
        assert_eq!(enabled, vec!["privileged-container"]);
    }

    #[test]
    fn test_all_built_in() {
        let reg = builtin_registry();
        let enabled = resolve_enabled_checks(&LintConfig::new().with_all_built_in(), &reg).unwrap();
        assert_eq!(enabled.len(), builtin_checks().len());
        assert!(enabled.contains(&"required-label-owner".to_string()));
    }

    #[test]
    fn test_unknown_checks_are_aggregated() {
        let reg = builtin_registry();
        let config = LintConfig::new().without_defaults().include("zeta").include("alpha");
        let err = resolve_enabled_checks(&config, &reg).unwrap_err();
        assert_eq!(
            err.to_string(),
            "enabled checks validation: check \"alpha\" not found; check \"zeta\" not found"
        );
    }

    #[test]
    fn test_custom_checks_register_and_enable() {
        let mut reg = builtin_registry();
        let config = LintConfig::new()
            .without_defaults()
            .with_custom_check(
                CheckSpec::new("required-team", "", "Add a team label.", "required-label")
                    .with_param("key", "team"),
            )
            .with_custom_check(CheckSpec::new("bad name", "", "", "required-label"));
        let err = register_custom_checks(&config, &mut reg).unwrap_err();
        let ConfigError::CustomChecks(errors) = err else {
            panic!("expected custom check errors");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("failed to register custom check bad name:"));
        assert!(reg.contains("required-team"));
    }
}
