//! # kubelint-engine
//!
//! The check engine of a Kubernetes manifest linter, modelled on
//! [kube-linter](https://github.com/stackrox/kube-linter).
//!
//! ## Pieces
//!
//! - **Object model** (`context`): decoded manifests as typed payloads, grouped in lint contexts
//! - **Extraction** (`extract`): canonical views (pod spec, selector, replicas, ...) across kinds
//! - **Kind matching** (`objectkinds`): named categories like `DeploymentLike` compiled into matchers
//! - **Templates** (`templates`): parameterized check logic, instantiated from typed params
//! - **Check registry** (`checkregistry`, `instantiated`): validated, ready-to-run checks
//! - **Run loop** (`run`): objects x checks with ignore annotations, producing reports
//! - **Lua checks** (`luaengine`): ad-hoc checks written in sandboxed Lua with a timeout
//!
//! ## Example
//!
//! ```rust,no_run
//! use kubelint_engine::{CheckRegistry, LintConfig, ObjectKindRegistry, TemplateRegistry};
//! use kubelint_engine::checks::register_builtin_checks;
//! use kubelint_engine::config::resolve_enabled_checks;
//! use kubelint_engine::context::decode::load_context;
//! use std::sync::Arc;
//!
//! # fn main() -> kubelint_engine::Result<()> {
//! let mut registry = CheckRegistry::new(
//!     Arc::new(TemplateRegistry::with_builtin_templates()?),
//!     Arc::new(ObjectKindRegistry::with_builtin_kinds()),
//! );
//! register_builtin_checks(&mut registry)?;
//!
//! let config = LintConfig::load_from_file(".kube-linter.yaml")?;
//! let enabled = resolve_enabled_checks(&config, &registry)?;
//!
//! let content = std::fs::read_to_string("deploy.yaml").unwrap_or_default();
//! let contexts = vec![load_context("deploy.yaml", &content)];
//! let result = kubelint_engine::run(&contexts, &registry, &enabled)?;
//! for report in &result.reports {
//!     println!("{}: {} ({})", report.object.name(), report.diagnostic, report.check);
//! }
//! # Ok(())
//! # }
//! ```

pub mod checkregistry;
pub mod checks;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod ignore;
pub mod instantiated;
pub mod luaengine;
pub mod objectkinds;
pub mod run;
pub mod templates;
pub mod types;

pub use checkregistry::{CheckError, CheckRegistry};
pub use config::{CheckSpec, LintConfig, ObjectKindsDesc};
pub use context::{LintContext, LintContextImpl, Object};
pub use error::{Error, Result};
pub use instantiated::InstantiatedCheck;
pub use objectkinds::{ObjectKindRegistry, ObjectKindsMatcher};
pub use run::run;
pub use templates::{CheckFunc, Template, TemplateRegistry};
pub use types::{CheckStatus, Diagnostic, LintResult, Report, Summary};

/// The current version of the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
