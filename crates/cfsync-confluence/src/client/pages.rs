//! Page operations for Confluence API.

use serde_json::json;
use tracing::{debug, info};

use super::{ConfluenceClient, checked_body, encode_query};
use crate::error::ConfluenceError;
use crate::types::{Content, ContentResponse};

impl ConfluenceClient {
    /// Find the first page in the configured space with the given title.
    pub(crate) fn find_page(
        &self,
        title: &str,
        expand: &str,
    ) -> Result<Option<Content>, ConfluenceError> {
        let url = format!(
            "{}/content?title={}&spaceKey={}&expand={}",
            self.api_url(),
            encode_query(title),
            encode_query(&self.space),
            expand
        );

        debug!(title, url = %url, "Looking up page");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        let found: ContentResponse = checked_body(response)?.read_json()?;
        Ok(found.results.into_iter().next())
    }

    /// Get page by ID with optional field expansion.
    pub(crate) fn get_page(
        &self,
        page_id: &str,
        expand: &[&str],
    ) -> Result<Content, ConfluenceError> {
        let mut url = format!("{}/content/{}", self.api_url(), page_id);

        if !expand.is_empty() {
            url.push_str("?expand=");
            url.push_str(&expand.join(","));
        }

        debug!(page_id, "Getting page");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        Ok(checked_body(response)?.read_json()?)
    }

    /// Create a page under `parent_id`.
    ///
    /// Returns `None` in dry-run mode.
    pub(crate) fn create_page(
        &self,
        title: &str,
        parent_id: &str,
        body: &str,
    ) -> Result<Option<String>, ConfluenceError> {
        if self.dry_run {
            info!(title, parent_id, "[dry-run] Would create page");
            return Ok(None);
        }

        let url = format!("{}/content", self.api_url());
        let payload = json!({
            "type": "page",
            "title": title,
            "space": {"key": self.space},
            "ancestors": [{"id": parent_id}],
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            }
        });

        info!(title, parent_id, "Creating page");

        let payload_bytes = serde_json::to_vec(&payload)?;
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let page: Content = checked_body(response)?.read_json()?;
        debug!(title, page_id = %page.id, "Create accepted");
        Ok(Some(page.id))
    }

    /// Replace a page body, publishing it as `version`.
    ///
    /// `version` must be the current version plus one.
    pub(crate) fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        version: u32,
    ) -> Result<(), ConfluenceError> {
        if self.dry_run {
            info!(page_id, title, version, "[dry-run] Would update page");
            return Ok(());
        }

        let url = format!("{}/content/{}", self.api_url(), page_id);
        let payload = json!({
            "id": page_id,
            "type": "page",
            "title": title,
            "space": {"key": self.space},
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            },
            "version": {"number": version}
        });

        info!(page_id, title, version, "Updating page");

        let payload_bytes = serde_json::to_vec(&payload)?;
        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        checked_body(response)?;
        Ok(())
    }
}
