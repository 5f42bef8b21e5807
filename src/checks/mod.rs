//! Built-in checks and their registration.

mod builtin;

pub use builtin::{DEFAULT_CHECKS, builtin_checks};

use crate::checkregistry::{CheckError, CheckRegistry};

/// Register every built-in check through the same path as user checks.
pub fn register_builtin_checks(registry: &mut CheckRegistry) -> Result<(), CheckError> {
    registry.register_all(&builtin_checks())
}
