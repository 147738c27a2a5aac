//! Confluence REST API client.
//!
//! Provides a sync HTTP client for the Confluence content API with HTTP
//! basic authentication. Every mutating call honors dry-run mode: it is
//! logged but never sent, and returns no identifier.

mod attachments;
mod pages;

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use ureq::Agent;

use crate::error::ConfluenceError;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Suffix some configurations carry on the host URL.
const CONTENT_API_SUFFIX: &str = "/rest/api/content";

/// Confluence REST API client.
pub struct ConfluenceClient {
    agent: Agent,
    base_url: String,
    space: String,
    auth_header: String,
    dry_run: bool,
}

impl ConfluenceClient {
    /// Create client from config values.
    ///
    /// # Arguments
    /// * `host_url` - Confluence base URL (a trailing `/rest/api/content` is stripped)
    /// * `space` - Space key every lookup and create is scoped to
    /// * `username` - Basic auth username
    /// * `password` - Basic auth password or API token
    #[must_use]
    pub fn from_config(host_url: &str, space: &str, username: &str, password: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: normalize_base_url(host_url),
            space: space.to_owned(),
            auth_header: basic_auth_header(username, password),
            dry_run: false,
        }
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether mutating calls are suppressed.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Space key.
    #[must_use]
    pub fn space(&self) -> &str {
        &self.space
    }

    /// Web URL of a page, used to rewrite links between synced pages.
    #[must_use]
    pub fn page_url(&self, page_id: &str) -> String {
        format!("{}/spaces/{}/pages/{}", self.base_url, self.space, page_id)
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}/rest/api", self.base_url)
    }
}

/// Read a response body, turning error statuses into [`ConfluenceError::HttpResponse`].
fn checked_body(
    response: ureq::http::Response<ureq::Body>,
) -> Result<ureq::Body, ConfluenceError> {
    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(ConfluenceError::HttpResponse {
            status,
            body: error_body,
        });
    }

    Ok(body)
}

/// Percent-encode a query parameter value.
fn encode_query(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn normalize_base_url(host_url: &str) -> String {
    let trimmed = host_url.trim_end_matches('/');
    trimmed
        .strip_suffix(CONTENT_API_SUFFIX)
        .unwrap_or(trimmed)
        .to_owned()
}

fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_strips_content_suffix() {
        assert_eq!(
            normalize_base_url("https://wiki.example.com/rest/api/content"),
            "https://wiki.example.com"
        );
        assert_eq!(
            normalize_base_url("https://wiki.example.com/wiki/"),
            "https://wiki.example.com/wiki"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(
            basic_auth_header("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_encode_query_encodes_spaces() {
        assert_eq!(encode_query("Getting Started"), "Getting%20Started");
        assert_eq!(encode_query("A&B"), "A%26B");
    }

    #[test]
    fn test_page_url() {
        let client = ConfluenceClient::from_config(
            "https://wiki.example.com/rest/api/content",
            "DOCS",
            "u",
            "p",
        );
        assert_eq!(
            client.page_url("42"),
            "https://wiki.example.com/spaces/DOCS/pages/42"
        );
        assert_eq!(client.api_url(), "https://wiki.example.com/rest/api");
    }

    #[test]
    fn test_dry_run_flag() {
        let client = ConfluenceClient::from_config("https://wiki.example.com", "DOCS", "u", "p");
        assert!(!client.dry_run());
        assert!(client.with_dry_run(true).dry_run());
    }
}
