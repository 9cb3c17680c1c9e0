//! Environment variable expansion for configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Variable referenced with `${NAME}` that is not set.
struct UnsetVar(String);

fn lookup(name: &str) -> Result<Option<String>, UnsetVar> {
    std::env::var(name)
        .map(Some)
        .map_err(|_| UnsetVar(name.to_owned()))
}

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Bare `$VAR` is left alone, so paths containing `$` stay intact.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }
    shellexpand::env_with_context(value, lookup)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.cause.0),
        })
}

/// Expand every entry of a path list in place, reporting the entry index.
pub(crate) fn expand_each(values: &mut [String], field: &str) -> Result<(), ConfigError> {
    for (index, value) in values.iter_mut().enumerate() {
        *value = expand_env(value, &format!("{field}[{index}]"))?;
    }
    Ok(())
}
