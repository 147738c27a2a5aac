//! Confluence content types.

use serde::Deserialize;

/// Confluence page as returned by the content endpoints.
///
/// Only includes fields that are actually used.
/// Serde ignores unknown fields from the API response.
#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    /// Page ID.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Version information (present with `expand=version`).
    #[serde(default)]
    pub version: Option<Version>,
    /// Ancestor chain, root first (present with `expand=ancestors`).
    #[serde(default)]
    pub ancestors: Vec<Ancestor>,
}

/// Content version.
#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    /// Version number.
    pub number: u32,
    /// Version message/comment.
    #[serde(default)]
    pub message: Option<String>,
}

/// Entry of a content ancestor chain.
#[derive(Debug, Clone, Deserialize)]
pub struct Ancestor {
    /// Ancestor page ID.
    pub id: String,
    /// Ancestor page title.
    pub title: String,
}

/// Content search response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResponse {
    /// Matching pages.
    pub results: Vec<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_with_version() {
        let json = r#"{
            "results": [
                {"id": "101", "type": "page", "title": "Install", "version": {"number": 4}}
            ],
            "size": 1
        }"#;
        let response: ContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "101");
        assert_eq!(response.results[0].version.as_ref().unwrap().number, 4);
        assert!(response.results[0].ancestors.is_empty());
    }

    #[test]
    fn test_parse_ancestors_root_first() {
        let json = r#"{
            "id": "303",
            "title": "Install",
            "ancestors": [
                {"id": "1", "title": "Documentation"},
                {"id": "202", "title": "Guide"}
            ]
        }"#;
        let content: Content = serde_json::from_str(json).unwrap();
        assert_eq!(content.ancestors.last().unwrap().title, "Guide");
    }
}
