//! Sandboxed Lua execution for script checks.
//!
//! Every call runs the script in a fresh Lua 5.4 state on its own worker
//! thread. The state opens only the `table`, `string`, `math` and `utf8`
//! libraries, has the file loaders (`dofile`, `loadfile`, `load`) removed,
//! and sees a small API bound to the object under check:
//!
//! - `extract.podSpec()`, `extract.labels()`, `extract.annotations()`,
//!   `extract.gvk()` return deep copies of the object's data (`podSpec()` is
//!   `nil` when the object has no pod template);
//! - `diagnostic(message)` builds a `{ message = ... }` table.
//!
//! The script must define a global `check()` returning an array of
//! diagnostics or `nil`.

use crossbeam::channel::{self, RecvTimeoutError};
use mlua::{
    Function, HookTriggers, Lua, LuaOptions, LuaSerdeExt, SerializeOptions, StdLib, Table, Value,
    VmState,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::context::{LintContext, Object};
use crate::extract;
use crate::types::Diagnostic;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);

/// Heap ceiling for one script state.
const MEMORY_LIMIT: usize = 64 * 1024 * 1024;
/// How often, in VM instructions, the deadline is checked.
const HOOK_INSTRUCTIONS: u32 = 1000;

const TIMEOUT_MESSAGE: &str = "lua script execution timeout";

/// Runs before the script. Protected calls re-raise once the deadline has
/// passed, so `pcall` cannot swallow the timeout.
const PRELUDE: &str = r#"
local raw_pcall, raw_xpcall, check_deadline = ...
local function settle(...)
  check_deadline()
  return ...
end
pcall = function(...) return settle(raw_pcall(...)) end
xpcall = function(...) return settle(raw_xpcall(...)) end
dofile, loadfile, load = nil, nil, nil
"#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("preparing lua state: {0}")]
    Sandbox(String),

    #[error("executing lua script: {0}")]
    Execute(String),

    #[error("calling check function: {0}")]
    Call(String),

    #[error("check function must return a table (array) of diagnostics")]
    Format,

    #[error("lua script execution timeout")]
    Timeout,

    #[error("lua script panicked")]
    Panicked,

    #[error("spawning lua worker: {0}")]
    Spawn(String),
}

/// A compiled-once, run-many script check.
#[derive(Debug, Clone)]
pub struct Engine {
    script: Arc<str>,
    timeout: Duration,
}

impl Engine {
    /// A zero timeout selects the default; anything above the ceiling is clamped.
    pub fn new(script: impl Into<String>, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout.min(MAX_TIMEOUT)
        };
        Self {
            script: Arc::from(script.into()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the script against one object.
    pub fn execute_check(
        &self,
        _ctx: &dyn LintContext,
        object: &Object,
    ) -> Result<Vec<Diagnostic>, ScriptError> {
        let inputs = ScriptInputs::from_object(object);
        let script = Arc::clone(&self.script);
        let deadline = Instant::now() + self.timeout;
        let (tx, rx) = channel::bounded(1);

        thread::Builder::new()
            .name("lua-check".to_string())
            .spawn(move || {
                let result = run_script(&script, inputs, deadline);
                // The caller may have given up already.
                let _ = tx.send(result);
            })
            .map_err(|e| ScriptError::Spawn(e.to_string()))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "abandoning lua worker for {} after {:?}",
                    object.name(),
                    self.timeout
                );
                Err(ScriptError::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(ScriptError::Panicked),
        }
    }
}

/// Object data handed to the worker, detached from the object's lifetime.
struct ScriptInputs {
    pod_spec: Option<serde_json::Value>,
    labels: serde_json::Value,
    annotations: serde_json::Value,
    gvk: serde_json::Value,
}

impl ScriptInputs {
    fn from_object(object: &Object) -> Self {
        let obj = object.k8s_object();
        Self {
            pod_spec: extract::pod_spec(obj).and_then(|spec| serde_json::to_value(&*spec).ok()),
            labels: serde_json::to_value(extract::labels(obj)).unwrap_or_default(),
            annotations: serde_json::to_value(extract::annotations(obj)).unwrap_or_default(),
            gvk: serde_json::to_value(object.gvk()).unwrap_or_default(),
        }
    }
}

fn run_script(
    script: &str,
    inputs: ScriptInputs,
    deadline: Instant,
) -> Result<Vec<Diagnostic>, ScriptError> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
        LuaOptions::default(),
    )
    .map_err(|e| ScriptError::Sandbox(e.to_string()))?;

    let timed_out = Rc::new(Cell::new(false));
    install_deadline(&lua, deadline, Rc::clone(&timed_out))
        .map_err(|e| ScriptError::Sandbox(e.to_string()))?;
    restrict_globals(&lua, deadline, Rc::clone(&timed_out))
        .map_err(|e| ScriptError::Sandbox(e.to_string()))?;
    register_api(&lua, inputs).map_err(|e| ScriptError::Sandbox(e.to_string()))?;

    let on_error = |wrap: fn(String) -> ScriptError| {
        let timed_out = Rc::clone(&timed_out);
        move |e: mlua::Error| {
            if timed_out.get() {
                ScriptError::Timeout
            } else {
                wrap(e.to_string())
            }
        }
    };

    lua.load(script)
        .set_name("check")
        .exec()
        .map_err(on_error(ScriptError::Execute))?;

    let check: Function = lua
        .globals()
        .get("check")
        .map_err(on_error(ScriptError::Call))?;
    let returned: Value = check.call(()).map_err(on_error(ScriptError::Call))?;

    parse_diagnostics(returned)
}

fn install_deadline(lua: &Lua, deadline: Instant, timed_out: Rc<Cell<bool>>) -> mlua::Result<()> {
    lua.set_memory_limit(MEMORY_LIMIT)?;
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(HOOK_INSTRUCTIONS),
        move |_lua, _debug| {
            if Instant::now() >= deadline {
                timed_out.set(true);
                return Err(mlua::Error::runtime(TIMEOUT_MESSAGE));
            }
            Ok(VmState::Continue)
        },
    );
    Ok(())
}

fn restrict_globals(lua: &Lua, deadline: Instant, timed_out: Rc<Cell<bool>>) -> mlua::Result<()> {
    let globals = lua.globals();
    let pcall: Function = globals.get("pcall")?;
    let xpcall: Function = globals.get("xpcall")?;
    let check_deadline = lua.create_function(move |_, ()| {
        if timed_out.get() || Instant::now() >= deadline {
            timed_out.set(true);
            return Err(mlua::Error::runtime(TIMEOUT_MESSAGE));
        }
        Ok(())
    })?;
    lua.load(PRELUDE)
        .set_name("sandbox")
        .call::<()>((pcall, xpcall, check_deadline))
}

fn register_api(lua: &Lua, inputs: ScriptInputs) -> mlua::Result<()> {
    let extract_table = lua.create_table()?;
    let ScriptInputs {
        pod_spec,
        labels,
        annotations,
        gvk,
    } = inputs;

    extract_table.set("podSpec", value_function(lua, pod_spec)?)?;
    extract_table.set("labels", value_function(lua, Some(labels))?)?;
    extract_table.set("annotations", value_function(lua, Some(annotations))?)?;
    extract_table.set("gvk", value_function(lua, Some(gvk))?)?;
    lua.globals().set("extract", extract_table)?;

    let diagnostic = lua.create_function(|lua, message: String| {
        let table = lua.create_table()?;
        table.set("message", message)?;
        Ok(table)
    })?;
    lua.globals().set("diagnostic", diagnostic)?;
    Ok(())
}

/// A zero-argument function returning a fresh Lua copy of `value` (or nil).
fn value_function(lua: &Lua, value: Option<serde_json::Value>) -> mlua::Result<Function> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.create_function(move |lua, ()| match &value {
        Some(v) => lua.to_value_with(v, options),
        None => Ok(Value::Nil),
    })
}

fn parse_diagnostics(returned: Value) -> Result<Vec<Diagnostic>, ScriptError> {
    let table: Table = match returned {
        Value::Nil => return Ok(Vec::new()),
        Value::Table(t) => t,
        _ => return Err(ScriptError::Format),
    };
    // Entries that are not tables with a string message are skipped.
    let diagnostics = table
        .sequence_values::<Value>()
        .filter_map(|entry| match entry {
            Ok(Value::Table(entry)) => match entry.raw_get::<Value>("message") {
                Ok(Value::String(message)) => Some(Diagnostic::new(message.to_string_lossy())),
                _ => None,
            },
            _ => None,
        })
        .collect();
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LintContextImpl;
    use crate::context::decode::load_context;

    fn context() -> LintContextImpl {
        let _ = env_logger::builder().is_test(true).try_init();
        load_context(
            "lua.yaml",
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  labels:
    env: production
  annotations:
    owner: team-a
spec:
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
        - name: web
          image: nginx:latest
        - name: sidecar
          image: envoy:1.28
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
"#,
        )
    }

    fn run(script: &str, index: usize) -> Result<Vec<String>, ScriptError> {
        let ctx = context();
        let engine = Engine::new(script, Duration::from_secs(2));
        engine
            .execute_check(&ctx, &ctx.objects()[index])
            .map(|d| d.into_iter().map(|d| d.message).collect())
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(run("function check() return {} end", 0).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_nil_result() {
        assert!(run("function check() return nil end", 0).unwrap().is_empty());
    }

    #[test]
    fn test_single_diagnostic() {
        let out = run("function check() return { diagnostic(\"found it\") } end", 0).unwrap();
        assert_eq!(out, vec!["found it"]);
    }

    #[test]
    fn test_labels_and_annotations() {
        let script = r#"
function check()
  local out = {}
  if extract.labels()["env"] == "production" then
    table.insert(out, diagnostic("Found production label"))
  end
  if extract.annotations()["owner"] == nil then
    table.insert(out, diagnostic("missing owner"))
  end
  return out
end
"#;
        assert_eq!(run(script, 0).unwrap(), vec!["Found production label"]);
    }

    #[test]
    fn test_pod_spec_containers() {
        let script = r#"
function check()
  local out = {}
  local spec = extract.podSpec()
  if spec == nil then return out end
  for _, c in ipairs(spec.containers) do
    if string.match(c.image, ":latest$") then
      table.insert(out, diagnostic("container " .. c.name .. " uses latest"))
    end
  end
  return out
end
"#;
        assert_eq!(run(script, 0).unwrap(), vec!["container web uses latest"]);
        assert!(run(script, 1).unwrap().is_empty());
    }

    #[test]
    fn test_gvk() {
        let script = r#"
function check()
  local gvk = extract.gvk()
  return { diagnostic(gvk.Group .. "/" .. gvk.Version .. " " .. gvk.Kind) }
end
"#;
        assert_eq!(run(script, 0).unwrap(), vec!["apps/v1 Deployment"]);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let script = r#"
function check()
  return { "text", { message = 42 }, { other = "x" }, diagnostic("kept") }
end
"#;
        assert_eq!(run(script, 0).unwrap(), vec!["kept"]);
    }

    #[test]
    fn test_non_table_result() {
        assert_eq!(
            run("function check() return 42 end", 0).unwrap_err(),
            ScriptError::Format
        );
    }

    #[test]
    fn test_syntax_error() {
        let err = run("function check( return {} end", 0).unwrap_err();
        assert!(matches!(err, ScriptError::Execute(_)));
        assert!(err.to_string().starts_with("executing lua script:"));
    }

    #[test]
    fn test_runtime_error() {
        let err = run("function check() error(\"boom\") end", 0).unwrap_err();
        assert!(matches!(err, ScriptError::Call(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_missing_check_function() {
        let err = run("local x = 1", 0).unwrap_err();
        assert!(matches!(err, ScriptError::Call(_)));
    }

    #[test]
    fn test_sandbox_has_no_io() {
        let script = r#"
function check()
  local out = {}
  for _, name in ipairs({ "io", "os", "package", "require", "dofile", "loadfile", "load" }) do
    if _G[name] ~= nil then
      table.insert(out, diagnostic(name .. " is reachable"))
    end
  end
  return out
end
"#;
        assert_eq!(run(script, 0).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_protected_calls_still_work() {
        let script = r#"
function check()
  local ok, err = pcall(error, "caught")
  local xok = xpcall(function() error("again") end, function(e) return e end)
  if not ok and not xok and string.find(err, "caught") then
    return { diagnostic("recovered") }
  end
  return {}
end
"#;
        assert_eq!(run(script, 0).unwrap(), vec!["recovered"]);
    }

    #[test]
    fn test_deadline_not_swallowed_by_protected_calls() {
        let scripts = [
            "function check() while true do pcall(function() while true do end end) end end",
            "function check() while true do xpcall(function() while true do end end, function(e) return e end) end end",
        ];
        let ctx = context();
        for script in scripts {
            let inputs = ScriptInputs::from_object(&ctx.objects()[0]);
            let (tx, rx) = channel::bounded(1);
            thread::spawn(move || {
                let _ = tx.send(run_script(script, inputs, Instant::now() + Duration::from_millis(100)));
            });
            let result = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("worker stops once the deadline passes");
            assert_eq!(result.unwrap_err(), ScriptError::Timeout, "{script}");
        }
    }

    #[test]
    fn test_timeout() {
        let ctx = context();
        let engine = Engine::new("function check() while true do end end", Duration::from_millis(100));
        let start = Instant::now();
        let err = engine.execute_check(&ctx, &ctx.objects()[0]).unwrap_err();
        assert_eq!(err, ScriptError::Timeout);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_timeout_clamping() {
        assert_eq!(Engine::new("", Duration::ZERO).timeout(), DEFAULT_TIMEOUT);
        assert_eq!(Engine::new("", Duration::from_secs(60)).timeout(), MAX_TIMEOUT);
        assert_eq!(Engine::new("", Duration::from_secs(7)).timeout(), Duration::from_secs(7));
    }
}
