//! CLI error types.

use cfsync_config::ConfigError;
use cfsync_docs::DocsError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Docs(#[from] DocsError),

    #[error("{failed} of {total} page(s) failed")]
    Failures { failed: usize, total: usize },
}
