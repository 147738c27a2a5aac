//! Remote directory abstraction.
//!
//! [`RemoteDirectory`] is the seam between the reconciliation protocol and the
//! Confluence REST API: one method per remote call, no business logic.
//! [`ConfluenceClient`] is the production implementation.

use crate::client::ConfluenceClient;
use crate::error::ConfluenceError;

/// Opaque page identifier assigned by Confluence.
pub type PageId = String;

/// Attachment as seen by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAttachment {
    /// Attachment ID.
    pub id: String,
    /// Filename the attachment is keyed by on its page.
    pub filename: String,
    /// Version message of the latest upload.
    pub message: Option<String>,
}

/// File content to upload as an attachment.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentUpload<'a> {
    /// Basename the attachment is stored under.
    pub filename: &'a str,
    /// File bytes.
    pub data: &'a [u8],
    /// Version message carrying the fingerprint tag.
    pub message: &'a str,
}

/// Remote page directory scoped to a single space.
///
/// Write methods are no-ops in dry-run mode and return no identifiers, so
/// callers must not chain further calls on ids they did not receive.
pub trait RemoteDirectory {
    /// Id of the first page titled `title`.
    fn find_page_id(&self, title: &str) -> Result<Option<PageId>, ConfluenceError>;

    /// Current version number of the page titled `title`.
    fn find_page_version(&self, title: &str) -> Result<Option<u32>, ConfluenceError>;

    /// Title of the nearest ancestor of a page, if it has one.
    fn find_parent_title(&self, page_id: &str) -> Result<Option<String>, ConfluenceError>;

    /// Create a page under `parent_id`. Returns `None` in dry-run mode.
    fn create_page(
        &self,
        title: &str,
        parent_id: &str,
        body: &str,
    ) -> Result<Option<PageId>, ConfluenceError>;

    /// Publish a new body as `version`, which must be the current version plus one.
    fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        version: u32,
    ) -> Result<(), ConfluenceError>;

    /// Attachment of `page_id` stored under `filename`.
    fn find_attachment(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<RemoteAttachment>, ConfluenceError>;

    /// Upload a new attachment.
    fn create_attachment(
        &self,
        page_id: &str,
        upload: &AttachmentUpload<'_>,
    ) -> Result<(), ConfluenceError>;

    /// Upload new content for an existing attachment.
    fn update_attachment(
        &self,
        page_id: &str,
        attachment_id: &str,
        upload: &AttachmentUpload<'_>,
    ) -> Result<(), ConfluenceError>;

    /// Whether write methods are suppressed.
    fn is_dry_run(&self) -> bool;
}

impl RemoteDirectory for ConfluenceClient {
    fn find_page_id(&self, title: &str) -> Result<Option<PageId>, ConfluenceError> {
        Ok(self.find_page(title, "history")?.map(|page| page.id))
    }

    fn find_page_version(&self, title: &str) -> Result<Option<u32>, ConfluenceError> {
        match self.find_page(title, "version")? {
            Some(page) => page.version.map(|v| Some(v.number)).ok_or_else(|| {
                ConfluenceError::UnexpectedResponse(format!("page '{title}' has no version"))
            }),
            None => Ok(None),
        }
    }

    fn find_parent_title(&self, page_id: &str) -> Result<Option<String>, ConfluenceError> {
        // Ancestors are ordered root first.
        let page = self.get_page(page_id, &["ancestors"])?;
        Ok(page.ancestors.into_iter().last().map(|a| a.title))
    }

    fn create_page(
        &self,
        title: &str,
        parent_id: &str,
        body: &str,
    ) -> Result<Option<PageId>, ConfluenceError> {
        ConfluenceClient::create_page(self, title, parent_id, body)
    }

    fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        version: u32,
    ) -> Result<(), ConfluenceError> {
        ConfluenceClient::update_page(self, page_id, title, body, version)
    }

    fn find_attachment(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<RemoteAttachment>, ConfluenceError> {
        Ok(
            ConfluenceClient::find_attachment(self, page_id, filename)?.map(|a| RemoteAttachment {
                id: a.id,
                filename: a.title,
                message: a.version.and_then(|v| v.message),
            }),
        )
    }

    fn create_attachment(
        &self,
        page_id: &str,
        upload: &AttachmentUpload<'_>,
    ) -> Result<(), ConfluenceError> {
        ConfluenceClient::create_attachment(
            self,
            page_id,
            upload.filename,
            upload.data,
            upload.message,
        )
    }

    fn update_attachment(
        &self,
        page_id: &str,
        attachment_id: &str,
        upload: &AttachmentUpload<'_>,
    ) -> Result<(), ConfluenceError> {
        ConfluenceClient::update_attachment(
            self,
            page_id,
            attachment_id,
            upload.filename,
            upload.data,
            upload.message,
        )
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run()
    }
}
