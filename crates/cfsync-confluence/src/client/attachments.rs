//! Attachment operations for Confluence API.

use rand::RngExt;
use tracing::{debug, info};

use super::{ConfluenceClient, checked_body, encode_query};
use crate::error::ConfluenceError;
use crate::types::{Attachment, AttachmentsResponse};

impl ConfluenceClient {
    /// Find an attachment of a page by filename, with its version message.
    pub(crate) fn find_attachment(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<Attachment>, ConfluenceError> {
        let url = format!(
            "{}/content/{}/child/attachment?filename={}&expand=version",
            self.api_url(),
            page_id,
            encode_query(filename)
        );

        debug!(page_id, filename, "Looking up attachment");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .call()?;

        let found: AttachmentsResponse = checked_body(response)?.read_json()?;
        Ok(found.results.into_iter().find(|a| a.title == filename))
    }

    /// Upload a new attachment.
    pub(crate) fn create_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        comment: &str,
    ) -> Result<(), ConfluenceError> {
        if self.dry_run {
            info!(page_id, filename, "[dry-run] Would upload attachment");
            return Ok(());
        }

        info!(page_id, filename, "Uploading new attachment");
        let url = format!("{}/content/{}/child/attachment", self.api_url(), page_id);
        self.post_multipart(&url, filename, data, comment)
    }

    /// Upload new data for an existing attachment.
    pub(crate) fn update_attachment(
        &self,
        page_id: &str,
        attachment_id: &str,
        filename: &str,
        data: &[u8],
        comment: &str,
    ) -> Result<(), ConfluenceError> {
        if self.dry_run {
            info!(
                page_id,
                attachment_id, filename, "[dry-run] Would update attachment"
            );
            return Ok(());
        }

        info!(page_id, attachment_id, filename, "Updating attachment");
        let url = format!(
            "{}/content/{}/child/attachment/{}/data",
            self.api_url(),
            page_id,
            attachment_id
        );
        self.post_multipart(&url, filename, data, comment)
    }

    fn post_multipart(
        &self,
        url: &str,
        filename: &str,
        data: &[u8],
        comment: &str,
    ) -> Result<(), ConfluenceError> {
        let boundary = format!("----CfsyncFormBoundary{:016x}", rand::rng().random::<u64>());
        let body = multipart_body(&boundary, filename, &content_type_for(filename), data, comment);

        let response = self
            .agent
            .post(url)
            .header("Authorization", &self.auth_header)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .send(&body[..])?;

        checked_body(response)?;
        Ok(())
    }
}

/// Build multipart form data with a `file` part and a `comment` part.
fn multipart_body(
    boundary: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
    comment: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"comment\"\r\n\r\n");
    body.extend_from_slice(comment.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// MIME type of an upload, by extension.
fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("XYZ", "a.png", "image/png", b"DATA", "cfsync [vabc]");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\nDATA\r\n"));
        assert!(text.contains("name=\"comment\"\r\n\r\ncfsync [vabc]\r\n"));
        assert!(text.ends_with("--XYZ--\r\n"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("diagram.PNG"), "image/png");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("manual.pdf"), "application/pdf");
        assert_eq!(content_type_for("scan.bmp"), "image/bmp");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("archive"), "application/octet-stream");
    }
}
