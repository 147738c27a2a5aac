//! Reconciliation error types.

use std::path::PathBuf;

use crate::error::ConfluenceError;
use crate::hierarchy::Stage;

/// Why reconciliation of a page stopped.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote page exists under a different parent. Never retried.
    #[error(
        "remote parent is '{}', expected '{expected}'; leaving remote page untouched",
        .actual.as_deref().unwrap_or("<none>")
    )]
    ParentMismatch {
        /// Local nearest parent.
        expected: String,
        /// Nearest remote ancestor, if any.
        actual: Option<String>,
    },

    /// Configured root page cannot be found in the space.
    #[error("main parent page '{root}' not found in space")]
    MissingRoot {
        /// Configured main parent title.
        root: String,
    },

    /// A just-created parent never became usable.
    #[error("parent '{parent}' still unavailable after {attempts} attempts: {source}")]
    ParentUnavailable {
        /// Parent title.
        parent: String,
        /// Attempts made.
        attempts: u32,
        /// Last create failure.
        #[source]
        source: ConfluenceError,
    },

    /// Page disappeared between lookups.
    #[error("page disappeared during reconciliation")]
    PageVanished,

    /// Remote call failed.
    #[error(transparent)]
    Remote(#[from] ConfluenceError),

    /// Local attachment file could not be read.
    #[error("failed to read attachment {}: {source}", .path.display())]
    Attachment {
        /// Local file path.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A [`SyncError`] with the page context needed to diagnose it.
#[derive(Debug, thiserror::Error)]
#[error("'{title}' (parent '{parent}') stopped at {stage}: {source}")]
pub struct PageError {
    /// Page title.
    pub title: String,
    /// Nearest expected parent title.
    pub parent: String,
    /// Last stage reached.
    pub stage: Stage,
    /// Cause.
    #[source]
    pub source: SyncError,
}

impl PageError {
    /// Whether the page was skipped because it lives under another parent.
    #[must_use]
    pub fn is_parent_mismatch(&self) -> bool {
        matches!(self.source, SyncError::ParentMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_mismatch_message() {
        let err = SyncError::ParentMismatch {
            expected: "Guide".to_owned(),
            actual: Some("Archive".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "remote parent is 'Archive', expected 'Guide'; leaving remote page untouched"
        );

        let err = SyncError::ParentMismatch {
            expected: "Guide".to_owned(),
            actual: None,
        };
        assert!(err.to_string().contains("'<none>'"));
    }

    #[test]
    fn test_page_error_carries_context() {
        let err = PageError {
            title: "Install".to_owned(),
            parent: "Guide".to_owned(),
            stage: Stage::CreatePath,
            source: SyncError::MissingRoot {
                root: "Documentation".to_owned(),
            },
        };
        assert_eq!(
            err.to_string(),
            "'Install' (parent 'Guide') stopped at create path: \
             main parent page 'Documentation' not found in space"
        );
        assert!(!err.is_parent_mismatch());
    }

    #[test]
    fn test_remote_error_is_transparent() {
        let err = SyncError::from(ConfluenceError::HttpResponse {
            status: 409,
            body: "conflict".to_owned(),
        });
        assert!(matches!(err, SyncError::Remote(ref e) if e.is_conflict()));
    }
}
