//! CLI error types.

use pigeon_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{failed} of {total} {what} failed")]
    Failed {
        failed: usize,
        total: usize,
        what: &'static str,
    },
}
