//! Error types for loading documentation sources.

use std::path::PathBuf;

/// Error loading the navigation tree or page sources.
#[derive(Debug, thiserror::Error)]
pub enum DocsError {
    /// Documentation source directory does not exist.
    #[error("Documentation directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Navigation file does not exist.
    #[error("Navigation file not found: {}", .0.display())]
    NavNotFound(PathBuf),

    /// Failed to read a file.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Navigation file is not valid YAML.
    #[error("Failed to parse {}: {source}", .path.display())]
    Yaml {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Navigation entry has an unsupported shape.
    #[error("Invalid nav entry: {0}")]
    InvalidNav(String),
}

impl DocsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
