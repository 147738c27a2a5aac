//! In-memory remote directory for testing.
//!
//! Provides [`MockDirectory`] for exercising the reconciliation protocol
//! without a Confluence server. Write calls are recorded in order, pages created
//! through the mock can be kept invisible for a number of observations to
//! simulate eventual consistency, and creates can be made to fail.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use crate::directory::{AttachmentUpload, PageId, RemoteAttachment, RemoteDirectory};
use crate::error::ConfluenceError;

/// Write call recorded by [`MockDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `create_page` attempt (recorded even when it fails).
    CreatePage {
        /// Title of the page to create.
        title: String,
        /// Parent the page was requested under.
        parent_id: String,
    },
    /// `update_page` call.
    UpdatePage {
        /// Updated page.
        page_id: String,
        /// Title sent with the update.
        title: String,
        /// Version sent with the update.
        version: u32,
    },
    /// `create_attachment` call.
    CreateAttachment {
        /// Owning page.
        page_id: String,
        /// Attachment filename.
        filename: String,
        /// Version message.
        message: String,
    },
    /// `update_attachment` call.
    UpdateAttachment {
        /// Owning page.
        page_id: String,
        /// Updated attachment.
        attachment_id: String,
        /// Attachment filename.
        filename: String,
        /// Version message.
        message: String,
    },
}

/// Page stored by [`MockDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPage {
    /// Page ID.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Parent page ID.
    pub parent_id: Option<String>,
    /// Current version.
    pub version: u32,
    /// Current body.
    pub body: String,
    /// Observations left before the page becomes visible.
    hidden_for: u32,
}

#[derive(Debug, Clone)]
struct MockAttachment {
    id: String,
    page_id: String,
    filename: String,
    message: String,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    pages: Vec<MockPage>,
    attachments: Vec<MockAttachment>,
    calls: Vec<Call>,
    next_id: u64,
    visibility_delay: u32,
    create_failures: HashMap<String, VecDeque<u16>>,
}

impl MockState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}", 1000 + self.next_id)
    }

    /// Look a page up by title, consuming one observation if it is still hidden.
    fn observe_title(&mut self, title: &str) -> Option<&MockPage> {
        let page = self.pages.iter_mut().find(|p| p.title == title)?;
        if page.hidden_for > 0 {
            page.hidden_for -= 1;
            return None;
        }
        Some(page)
    }

    fn observe_id(&mut self, id: &str) -> Option<&MockPage> {
        let page = self.pages.iter_mut().find(|p| p.id == id)?;
        if page.hidden_for > 0 {
            page.hidden_for -= 1;
            return None;
        }
        Some(page)
    }
}

/// In-memory remote directory.
///
/// # Example
///
/// ```ignore
/// use cfsync_confluence::MockDirectory;
///
/// let remote = MockDirectory::new()
///     .with_page("Documentation", None)
///     .with_page("Guide", Some("Documentation"));
///
/// assert!(remote.page_id("Guide").is_some());
/// ```
#[derive(Debug, Default)]
pub struct MockDirectory {
    state: RwLock<MockState>,
    dry_run: bool,
}

impl MockDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a visible page at version 1 under the page titled `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is given but not present, or if the lock is poisoned.
    #[must_use]
    pub fn with_page(self, title: &str, parent: Option<&str>) -> Self {
        {
            let mut state = self.state.write().unwrap();
            let parent_id = parent.map(|p| {
                state
                    .pages
                    .iter()
                    .find(|page| page.title == p)
                    .map(|page| page.id.clone())
                    .unwrap_or_else(|| panic!("parent '{p}' not in mock"))
            });
            let id = state.allocate_id();
            state.pages.push(MockPage {
                id,
                title: title.to_owned(),
                parent_id,
                version: 1,
                body: String::new(),
                hidden_for: 0,
            });
        }
        self
    }

    /// Set the current version of an existing page.
    ///
    /// # Panics
    ///
    /// Panics if the page is not present or the lock is poisoned.
    #[must_use]
    pub fn with_version(self, title: &str, version: u32) -> Self {
        {
            let mut state = self.state.write().unwrap();
            let page = state
                .pages
                .iter_mut()
                .find(|p| p.title == title)
                .unwrap_or_else(|| panic!("page '{title}' not in mock"));
            page.version = version;
        }
        self
    }

    /// Add an attachment with the given version message to an existing page.
    ///
    /// # Panics
    ///
    /// Panics if the page is not present or the lock is poisoned.
    #[must_use]
    pub fn with_attachment(self, page_title: &str, filename: &str, message: &str) -> Self {
        {
            let mut state = self.state.write().unwrap();
            let page_id = state
                .pages
                .iter()
                .find(|p| p.title == page_title)
                .map(|p| p.id.clone())
                .unwrap_or_else(|| panic!("page '{page_title}' not in mock"));
            let id = format!("att{}", state.allocate_id());
            state.attachments.push(MockAttachment {
                id,
                page_id,
                filename: filename.to_owned(),
                message: message.to_owned(),
                data: Vec::new(),
            });
        }
        self
    }

    /// Keep every page created through the mock invisible for its first
    /// `observations` lookups or parent references.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_visibility_delay(self, observations: u32) -> Self {
        self.state.write().unwrap().visibility_delay = observations;
        self
    }

    /// Make the next create of `title` fail with `status`. Repeatable.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_create_failure(self, title: &str, status: u16) -> Self {
        self.state
            .write()
            .unwrap()
            .create_failures
            .entry(title.to_owned())
            .or_default()
            .push_back(status);
        self
    }

    /// Suppress writes: calls are recorded but not applied.
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Recorded write calls, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.read().unwrap().calls.clone()
    }

    /// Forget recorded calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear_calls(&self) {
        self.state.write().unwrap().calls.clear();
    }

    /// Snapshot of a page, ignoring visibility.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page(&self, title: &str) -> Option<MockPage> {
        self.state
            .read()
            .unwrap()
            .pages
            .iter()
            .find(|p| p.title == title)
            .cloned()
    }

    /// Id of a page, ignoring visibility.
    #[must_use]
    pub fn page_id(&self, title: &str) -> Option<String> {
        self.page(title).map(|p| p.id)
    }

    /// Stored message of an attachment, ignoring visibility.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn attachment_message(&self, page_title: &str, filename: &str) -> Option<String> {
        let page_id = self.page_id(page_title)?;
        self.state
            .read()
            .unwrap()
            .attachments
            .iter()
            .find(|a| a.page_id == page_id && a.filename == filename)
            .map(|a| a.message.clone())
    }

    fn http_error(status: u16, body: &str) -> ConfluenceError {
        ConfluenceError::HttpResponse {
            status,
            body: body.to_owned(),
        }
    }
}

impl RemoteDirectory for MockDirectory {
    fn find_page_id(&self, title: &str) -> Result<Option<PageId>, ConfluenceError> {
        let mut state = self.state.write().unwrap();
        Ok(state.observe_title(title).map(|p| p.id.clone()))
    }

    fn find_page_version(&self, title: &str) -> Result<Option<u32>, ConfluenceError> {
        let mut state = self.state.write().unwrap();
        Ok(state.observe_title(title).map(|p| p.version))
    }

    fn find_parent_title(&self, page_id: &str) -> Result<Option<String>, ConfluenceError> {
        let state = self.state.read().unwrap();
        let page = state
            .pages
            .iter()
            .find(|p| p.id == page_id)
            .ok_or_else(|| Self::http_error(404, "page not found"))?;
        Ok(page.parent_id.as_ref().and_then(|parent_id| {
            state
                .pages
                .iter()
                .find(|p| &p.id == parent_id)
                .map(|p| p.title.clone())
        }))
    }

    fn create_page(
        &self,
        title: &str,
        parent_id: &str,
        body: &str,
    ) -> Result<Option<PageId>, ConfluenceError> {
        let mut state = self.state.write().unwrap();
        state.calls.push(Call::CreatePage {
            title: title.to_owned(),
            parent_id: parent_id.to_owned(),
        });

        if let Some(status) = state
            .create_failures
            .get_mut(title)
            .and_then(VecDeque::pop_front)
        {
            return Err(Self::http_error(status, "injected failure"));
        }
        if state.observe_id(parent_id).is_none() {
            return Err(Self::http_error(404, "parent page not found"));
        }
        if state.pages.iter().any(|p| p.title == title) {
            return Err(Self::http_error(400, "title already exists in space"));
        }
        if self.dry_run {
            return Ok(None);
        }

        let id = state.allocate_id();
        let hidden_for = state.visibility_delay;
        state.pages.push(MockPage {
            id: id.clone(),
            title: title.to_owned(),
            parent_id: Some(parent_id.to_owned()),
            version: 1,
            body: body.to_owned(),
            hidden_for,
        });
        Ok(Some(id))
    }

    fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        version: u32,
    ) -> Result<(), ConfluenceError> {
        let mut state = self.state.write().unwrap();
        state.calls.push(Call::UpdatePage {
            page_id: page_id.to_owned(),
            title: title.to_owned(),
            version,
        });

        let dry_run = self.dry_run;
        let page = state
            .pages
            .iter_mut()
            .find(|p| p.id == page_id)
            .ok_or_else(|| Self::http_error(404, "page not found"))?;
        if version != page.version + 1 {
            return Err(Self::http_error(409, "version conflict"));
        }
        if !dry_run {
            page.version = version;
            page.title = title.to_owned();
            page.body = body.to_owned();
        }
        Ok(())
    }

    fn find_attachment(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<RemoteAttachment>, ConfluenceError> {
        let state = self.state.read().unwrap();
        Ok(state
            .attachments
            .iter()
            .find(|a| a.page_id == page_id && a.filename == filename)
            .map(|a| RemoteAttachment {
                id: a.id.clone(),
                filename: a.filename.clone(),
                message: Some(a.message.clone()),
            }))
    }

    fn create_attachment(
        &self,
        page_id: &str,
        upload: &AttachmentUpload<'_>,
    ) -> Result<(), ConfluenceError> {
        let mut state = self.state.write().unwrap();
        state.calls.push(Call::CreateAttachment {
            page_id: page_id.to_owned(),
            filename: upload.filename.to_owned(),
            message: upload.message.to_owned(),
        });
        if self.dry_run {
            return Ok(());
        }
        let id = format!("att{}", state.allocate_id());
        state.attachments.push(MockAttachment {
            id,
            page_id: page_id.to_owned(),
            filename: upload.filename.to_owned(),
            message: upload.message.to_owned(),
            data: upload.data.to_vec(),
        });
        Ok(())
    }

    fn update_attachment(
        &self,
        page_id: &str,
        attachment_id: &str,
        upload: &AttachmentUpload<'_>,
    ) -> Result<(), ConfluenceError> {
        let mut state = self.state.write().unwrap();
        state.calls.push(Call::UpdateAttachment {
            page_id: page_id.to_owned(),
            attachment_id: attachment_id.to_owned(),
            filename: upload.filename.to_owned(),
            message: upload.message.to_owned(),
        });
        if self.dry_run {
            return Ok(());
        }
        let attachment = state
            .attachments
            .iter_mut()
            .find(|a| a.id == attachment_id)
            .ok_or_else(|| Self::http_error(404, "attachment not found"))?;
        attachment.message = upload.message.to_owned();
        attachment.data = upload.data.to_vec();
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_page_hidden_for_delay() {
        let remote = MockDirectory::new()
            .with_page("Root", None)
            .with_visibility_delay(2);
        let root = remote.page_id("Root").unwrap();

        let id = remote.create_page("Child", &root, "<p/>").unwrap().unwrap();

        assert_eq!(remote.find_page_id("Child").unwrap(), None);
        assert_eq!(remote.find_page_id("Child").unwrap(), None);
        assert_eq!(remote.find_page_id("Child").unwrap(), Some(id));
    }

    #[test]
    fn test_create_under_hidden_parent_fails() {
        let remote = MockDirectory::new()
            .with_page("Root", None)
            .with_visibility_delay(1);
        let root = remote.page_id("Root").unwrap();
        let parent = remote.create_page("Parent", &root, "").unwrap().unwrap();

        let err = remote.create_page("Child", &parent, "").unwrap_err();
        assert_eq!(err.status(), Some(404));

        assert!(remote.create_page("Child", &parent, "").unwrap().is_some());
    }

    #[test]
    fn test_update_requires_next_version() {
        let remote = MockDirectory::new()
            .with_page("Root", None)
            .with_version("Root", 3);
        let root = remote.page_id("Root").unwrap();

        assert!(remote.update_page(&root, "Root", "x", 3).unwrap_err().is_conflict());
        remote.update_page(&root, "Root", "x", 4).unwrap();
        assert_eq!(remote.page("Root").unwrap().version, 4);
    }

    #[test]
    fn test_dry_run_records_without_applying() {
        let remote = MockDirectory::new().with_page("Root", None).dry_run();
        let root = remote.page_id("Root").unwrap();

        assert_eq!(remote.create_page("Child", &root, "").unwrap(), None);
        assert!(remote.page("Child").is_none());
        assert_eq!(remote.calls().len(), 1);
    }
}
