//! Lua script template: checks written as Lua scripts.
//!
//! A script comes either from a file (`script`, relative paths resolve
//! against the working directory) or inline (`inline`). Script failures at
//! run time become a single diagnostic instead of aborting the run.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::context::{LintContext, Object};
use crate::luaengine::Engine;
use crate::objectkinds::ANY;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const TEMPLATE_KEY: &str = "lua-script";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    #[serde(default)]
    script: String,
    #[serde(default)]
    inline: String,
    /// Seconds; zero selects the engine default.
    #[serde(default)]
    timeout: u64,
}

pub struct LuaScriptTemplate;

impl Template for LuaScriptTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Lua Script"
    }

    fn description(&self) -> &str {
        "Run custom Lua script checks against Kubernetes objects"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[ANY]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new("script", "string", "Path to the Lua script file"),
            ParameterDesc::new(
                "inline",
                "string",
                "Inline Lua script content (alternative to script)",
            ),
            ParameterDesc::new("timeout", "integer", "Execution timeout in seconds")
                .with_default(5),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        if !params.script.is_empty() && !params.inline.is_empty() {
            return Err(TemplateError::InvalidParams(
                "cannot specify both 'script' and 'inline' parameters".to_string(),
            ));
        }
        if params.script.is_empty() && params.inline.is_empty() {
            return Err(TemplateError::InvalidParams(
                "must specify either 'script' or 'inline' parameter".to_string(),
            ));
        }
        Ok(ParsedParams::new(params))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let params: Params = params.downcast(TEMPLATE_KEY)?;
        let script = load_script(&params)?;
        let engine = Engine::new(script, Duration::from_secs(params.timeout));
        Ok(Box::new(LuaScriptCheck { engine }))
    }
}

fn load_script(params: &Params) -> Result<String, TemplateError> {
    if !params.inline.is_empty() {
        return Ok(params.inline.clone());
    }
    let mut path = PathBuf::from(&params.script);
    if path.is_relative() {
        let cwd = std::env::current_dir().map_err(|e| {
            TemplateError::Instantiate(format!("getting working directory: {}", e))
        })?;
        path = cwd.join(path);
    }
    std::fs::read_to_string(&path).map_err(|e| {
        TemplateError::Instantiate(format!("reading script file {}: {}", path.display(), e))
    })
}

struct LuaScriptCheck {
    engine: Engine,
}

impl CheckFunc for LuaScriptCheck {
    fn check(&self, ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        match self.engine.execute_check(ctx, object) {
            Ok(diagnostics) => diagnostics,
            Err(e) => {
                log::warn!("lua script check failed on {}: {}", object.name(), e);
                vec![Diagnostic::new(format!("Lua script error: {}", e))]
            }
        }
    }
}
