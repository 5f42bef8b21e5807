//! Crate-level error type.
//!
//! Each subsystem owns a focused error enum; this wraps them so callers that
//! drive the whole pipeline (config -> registry -> run) can use one `Result`.

use thiserror::Error;

use crate::checkregistry::CheckError;
use crate::config::ConfigError;
use crate::luaengine::ScriptError;
use crate::objectkinds::MatcherError;
use crate::templates::TemplateError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
