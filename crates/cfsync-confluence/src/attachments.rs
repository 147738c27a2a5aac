//! Attachment synchronization with content fingerprints.
//!
//! Confluence attachments have no content hash, so the SHA-1 of the uploaded
//! bytes is stored at the end of the version message as `[v<hex>]`. A file is
//! re-uploaded only when its digest differs from the stored one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::directory::{AttachmentUpload, RemoteDirectory};
use crate::sync::SyncError;

/// Marker preceding the fingerprint tag in attachment messages.
pub const FINGERPRINT_MARKER: &str = "cfsync";

static FINGERPRINT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[v([a-f0-9]{40})\]$").unwrap());

/// Hex SHA-1 digest of file content.
#[must_use]
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Attachment message carrying `fingerprint`.
#[must_use]
pub fn fingerprint_message(fingerprint: &str) -> String {
    format!("{FINGERPRINT_MARKER} [v{fingerprint}]")
}

/// Fingerprint at the end of an attachment message.
#[must_use]
pub fn extract_fingerprint(message: &str) -> Option<&str> {
    FINGERPRINT_TAG
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// What happened to one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentAction {
    /// Uploaded for the first time.
    Created,
    /// Content changed and was re-uploaded.
    Updated,
    /// Stored fingerprint matches; nothing sent.
    Unchanged,
}

impl fmt::Display for AttachmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Outcome for one local file.
#[derive(Debug)]
pub struct AttachmentReport {
    /// Local file path.
    pub path: PathBuf,
    /// Action taken, or why it failed.
    pub result: Result<AttachmentAction, SyncError>,
}

/// Uploads the files referenced by a page, skipping unchanged ones.
pub struct AttachmentSynchronizer<'a, D: ?Sized> {
    directory: &'a D,
}

impl<'a, D: RemoteDirectory + ?Sized> AttachmentSynchronizer<'a, D> {
    /// Create a synchronizer.
    #[must_use]
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Sync every file for a page that exists remotely.
    ///
    /// A failing file does not stop the others.
    pub fn sync_page(&self, page_id: &str, files: &[PathBuf]) -> Vec<AttachmentReport> {
        files
            .iter()
            .map(|path| AttachmentReport {
                path: path.clone(),
                result: self.sync_file(page_id, path),
            })
            .collect()
    }

    /// Sync one file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Attachment`] if the file cannot be read and
    /// [`SyncError::Remote`] if a remote call fails.
    pub fn sync_file(&self, page_id: &str, path: &Path) -> Result<AttachmentAction, SyncError> {
        let data = std::fs::read(path).map_err(|source| SyncError::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy());
        let digest = fingerprint(&data);
        let message = fingerprint_message(&digest);
        let upload = AttachmentUpload {
            filename: &filename,
            data: &data,
            message: &message,
        };

        match self.directory.find_attachment(page_id, &filename)? {
            None => {
                debug!(page_id, filename = %filename, "Creating attachment");
                self.directory.create_attachment(page_id, &upload)?;
                Ok(AttachmentAction::Created)
            }
            Some(existing)
                if existing.message.as_deref().and_then(extract_fingerprint)
                    == Some(digest.as_str()) =>
            {
                debug!(page_id, filename = %filename, "Attachment unchanged");
                Ok(AttachmentAction::Unchanged)
            }
            Some(existing) => {
                debug!(page_id, filename = %filename, attachment_id = %existing.id, "Updating attachment");
                self.directory
                    .update_attachment(page_id, &existing.id, &upload)?;
                Ok(AttachmentAction::Updated)
            }
        }
    }
}
