//! Page title derivation.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());

/// Title of a nav entry that names only a file: the first H1 heading, else
/// the file name in title case.
pub(crate) fn derive_title(file: &Path) -> String {
    fs::read_to_string(file)
        .ok()
        .and_then(|content| extract_h1(&content))
        .unwrap_or_else(|| {
            file.file_stem()
                .map(|s| titlecase_from_slug(&s.to_string_lossy().to_lowercase()))
                .unwrap_or_default()
        })
}

/// Title of a file missing from the nav: its bare stem.
pub(crate) fn fallback_title(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extract_h1(content: &str) -> Option<String> {
    let caps = H1.captures(content)?;
    Some(caps[1].trim().to_owned())
}

/// Convert a slug (kebab-case or `snake_case`) to title case.
fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}
