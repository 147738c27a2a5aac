//! Navigation tree.
//!
//! Reads the `nav:` list of an mkdocs-style YAML file into a typed tree with
//! index-based parent links. Entries take three shapes:
//!
//! ```yaml
//! nav:
//!   - index.md                  # page, title from its H1 or file name
//!   - Guide:                    # section, an ancestor with no content
//!       - Install: install.md   # titled page
//!   - https://example.com       # external link, ignored
//! ```
//!
//! Markdown files under the source directory that the nav does not list are
//! appended as top-level pages titled by their file stem.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::DocsError;
use crate::title::{derive_title, fallback_title};

/// Node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    /// Title, used as the remote page title.
    pub title: String,
    /// Markdown file relative to the source directory; `None` for sections.
    pub source: Option<PathBuf>,
    /// Index of the parent node.
    pub parent: Option<usize>,
    /// Nesting depth, 0 for top-level entries.
    pub depth: usize,
}

/// A page to publish, flattened from the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPage {
    /// Page title.
    pub title: String,
    /// Markdown file relative to the source directory.
    pub source: PathBuf,
    /// Ancestor titles, nearest first.
    pub ancestors: Vec<String>,
    /// Nesting depth.
    pub depth: usize,
}

/// A page whose title an earlier page in nav order already uses.
///
/// Remote titles are unique per space, so publishing both would overwrite
/// the first page with the second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleClash {
    /// The shared title.
    pub title: String,
    /// Source of the page that keeps the title.
    pub first: PathBuf,
    /// Source of the page that loses it.
    pub later: PathBuf,
}

/// Navigation tree in nav order.
#[derive(Debug, Clone, Default)]
pub struct NavTree {
    nodes: Vec<NavNode>,
}

impl NavTree {
    /// Load the tree from `nav_file` and add unlisted pages under `source_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if either path is missing, the nav file cannot be read
    /// or parsed, or a nav entry has an unsupported shape.
    pub fn load(nav_file: &Path, source_dir: &Path) -> Result<Self, DocsError> {
        if !source_dir.is_dir() {
            return Err(DocsError::SourceNotFound(source_dir.to_path_buf()));
        }
        if !nav_file.is_file() {
            return Err(DocsError::NavNotFound(nav_file.to_path_buf()));
        }

        let content =
            fs::read_to_string(nav_file).map_err(|e| DocsError::io(nav_file, e))?;
        let config: Value =
            serde_yaml::from_str(&content).map_err(|source| DocsError::Yaml {
                path: nav_file.to_path_buf(),
                source,
            })?;

        let mut tree = Self::from_config(&config, source_dir)?;
        tree.add_unlisted(source_dir)?;
        for clash in tree.title_clashes() {
            warn!(
                title = %clash.title,
                first = %clash.first.display(),
                later = %clash.later.display(),
                "Two pages share a title"
            );
        }
        Ok(tree)
    }

    /// Build the tree from a parsed config document holding a `nav` key.
    ///
    /// A missing `nav` key yields an empty tree.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::InvalidNav`] for entries of an unsupported shape.
    pub fn from_config(config: &Value, source_dir: &Path) -> Result<Self, DocsError> {
        let mut tree = Self::default();
        match config.get("nav") {
            Some(Value::Sequence(entries)) => tree.add_entries(entries, None, 0, source_dir)?,
            Some(Value::Null) | None => warn!("No nav section found, publishing pages by file name"),
            Some(other) => {
                return Err(DocsError::InvalidNav(format!(
                    "nav must be a list, got {other:?}"
                )));
            }
        }
        Ok(tree)
    }

    fn add_entries(
        &mut self,
        entries: &[Value],
        parent: Option<usize>,
        depth: usize,
        source_dir: &Path,
    ) -> Result<(), DocsError> {
        for entry in entries {
            match entry {
                Value::String(path) => self.add_page(None, path, parent, depth, source_dir),
                Value::Mapping(map) => {
                    for (key, value) in map {
                        let title = key.as_str().ok_or_else(|| {
                            DocsError::InvalidNav(format!("title must be a string, got {key:?}"))
                        })?;
                        match value {
                            Value::String(path) => {
                                self.add_page(Some(title), path, parent, depth, source_dir);
                            }
                            Value::Sequence(children) => {
                                let index = self.push(NavNode {
                                    title: title.to_owned(),
                                    source: None,
                                    parent,
                                    depth,
                                });
                                self.add_entries(children, Some(index), depth + 1, source_dir)?;
                            }
                            other => {
                                return Err(DocsError::InvalidNav(format!(
                                    "'{title}' must map to a path or a list, got {other:?}"
                                )));
                            }
                        }
                    }
                }
                other => {
                    return Err(DocsError::InvalidNav(format!("unexpected entry {other:?}")));
                }
            }
        }
        Ok(())
    }

    fn add_page(
        &mut self,
        title: Option<&str>,
        path: &str,
        parent: Option<usize>,
        depth: usize,
        source_dir: &Path,
    ) {
        if path.contains("://") {
            debug!(url = path, "Skipping external nav link");
            return;
        }
        let source = PathBuf::from(path);
        let title = title.map_or_else(|| derive_title(&source_dir.join(&source)), ToOwned::to_owned);
        self.push(NavNode {
            title,
            source: Some(source),
            parent,
            depth,
        });
    }

    fn push(&mut self, node: NavNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append markdown files under `source_dir` that the nav does not list.
    fn add_unlisted(&mut self, source_dir: &Path) -> Result<(), DocsError> {
        let mut files = Vec::new();
        collect_markdown(source_dir, source_dir, &mut files)?;
        files.sort();

        for source in files {
            if self.title_for(&source).is_some() {
                continue;
            }
            let title = fallback_title(&source);
            warn!(
                title = %title,
                path = %source.display(),
                "Page is not in the nav, using file name as title"
            );
            self.push(NavNode {
                title,
                source: Some(source),
                parent: None,
                depth: 0,
            });
        }
        Ok(())
    }

    /// All nodes in nav order.
    #[must_use]
    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    /// Ancestor titles of a node, nearest first.
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = &str> {
        std::iter::successors(
            self.nodes.get(index).and_then(|n| n.parent),
            |&i| self.nodes[i].parent,
        )
        .map(|i| self.nodes[i].title.as_str())
    }

    /// Pages with content, in nav order.
    #[must_use]
    pub fn pages(&self) -> Vec<NavPage> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                node.source.as_ref().map(|source| NavPage {
                    title: node.title.clone(),
                    source: source.clone(),
                    ancestors: self.ancestors(index).map(ToOwned::to_owned).collect(),
                    depth: node.depth,
                })
            })
            .collect()
    }

    /// Number of pages with content.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.source.is_some()).count()
    }

    /// Pages reusing the title of an earlier page, in nav order.
    #[must_use]
    pub fn title_clashes(&self) -> Vec<TitleClash> {
        let mut owners: HashMap<&str, &Path> = HashMap::new();
        let mut clashes = Vec::new();
        for node in &self.nodes {
            let Some(source) = node.source.as_deref() else {
                continue;
            };
            match owners.get(node.title.as_str()) {
                Some(first) => clashes.push(TitleClash {
                    title: node.title.clone(),
                    first: first.to_path_buf(),
                    later: source.to_path_buf(),
                }),
                None => {
                    owners.insert(&node.title, source);
                }
            }
        }
        clashes
    }

    /// Title of the page whose source is `source` (relative to the source directory).
    #[must_use]
    pub fn title_for(&self, source: &Path) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.source.as_deref() == Some(source))
            .map(|n| n.title.as_str())
    }
}

/// Recursively collect `.md` files under `dir`, relative to `root`.
fn collect_markdown(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DocsError> {
    let entries = fs::read_dir(dir).map_err(|e| DocsError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| DocsError::io(dir, e))?;
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            collect_markdown(root, &path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "md")
            && let Ok(relative) = path.strip_prefix(root)
        {
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn tree(yaml: &str, source_dir: &Path) -> NavTree {
        let config: Value = serde_yaml::from_str(yaml).unwrap();
        NavTree::from_config(&config, source_dir).unwrap()
    }

    #[test]
    fn test_titled_pages_and_sections() {
        let dir = TempDir::new().unwrap();
        let tree = tree(
            r"
nav:
  - Home: index.md
  - Guide:
      - Install: guide/install.md
      - Advanced:
          - Tuning: guide/tuning.md
",
            dir.path(),
        );

        let pages = tree.pages();
        assert_eq!(
            pages,
            vec![
                NavPage {
                    title: "Home".to_owned(),
                    source: PathBuf::from("index.md"),
                    ancestors: vec![],
                    depth: 0,
                },
                NavPage {
                    title: "Install".to_owned(),
                    source: PathBuf::from("guide/install.md"),
                    ancestors: vec!["Guide".to_owned()],
                    depth: 1,
                },
                NavPage {
                    title: "Tuning".to_owned(),
                    source: PathBuf::from("guide/tuning.md"),
                    ancestors: vec!["Advanced".to_owned(), "Guide".to_owned()],
                    depth: 2,
                },
            ]
        );
        assert_eq!(tree.nodes().len(), 5);
        assert_eq!(tree.page_count(), 3);
    }

    #[test]
    fn test_untitled_page_uses_h1() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("setup.md"), "# Setting Things Up\n").unwrap();

        let tree = tree("nav:\n  - setup.md\n", dir.path());

        assert_eq!(tree.title_for(Path::new("setup.md")), Some("Setting Things Up"));
    }

    #[test]
    fn test_external_links_ignored() {
        let dir = TempDir::new().unwrap();
        let tree = tree(
            "nav:\n  - Home: index.md\n  - Issues: https://example.com/issues\n",
            dir.path(),
        );

        assert_eq!(tree.page_count(), 1);
    }

    #[test]
    fn test_missing_nav_key_is_empty() {
        let dir = TempDir::new().unwrap();
        let tree = tree("site_name: Docs\n", dir.path());
        assert!(tree.nodes().is_empty());
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let config: Value = serde_yaml::from_str("nav:\n  - Home: 42\n").unwrap();
        let err = NavTree::from_config(&config, Path::new(".")).unwrap_err();
        assert!(matches!(err, DocsError::InvalidNav(_)));
    }

    #[test]
    fn test_load_appends_unlisted_pages() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("extra")).unwrap();
        fs::write(docs.join("index.md"), "# Home\n").unwrap();
        fs::write(docs.join("extra/getting-started.md"), "# Start\n").unwrap();
        let nav_file = dir.path().join("mkdocs.yml");
        fs::write(&nav_file, "site_name: Docs\nnav:\n  - Home: index.md\n").unwrap();

        let tree = NavTree::load(&nav_file, &docs).unwrap();

        let pages = tree.pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].title, "getting-started");
        assert_eq!(pages[1].source, PathBuf::from("extra/getting-started.md"));
        assert!(pages[1].ancestors.is_empty());
    }

    #[test]
    fn test_unlisted_pages_with_same_stem_clash() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("a")).unwrap();
        fs::create_dir_all(docs.join("b")).unwrap();
        fs::write(docs.join("a/index.md"), "Alpha\n").unwrap();
        fs::write(docs.join("b/index.md"), "Beta\n").unwrap();
        let nav_file = dir.path().join("mkdocs.yml");
        fs::write(&nav_file, "nav: []\n").unwrap();

        let tree = NavTree::load(&nav_file, &docs).unwrap();

        assert_eq!(
            tree.title_clashes(),
            vec![TitleClash {
                title: "index".to_owned(),
                first: PathBuf::from("a/index.md"),
                later: PathBuf::from("b/index.md"),
            }]
        );
    }

    #[test]
    fn test_sections_do_not_clash_with_pages() {
        let dir = TempDir::new().unwrap();
        let tree = tree(
            "nav:\n  - Guide:\n      - Guide: guide.md\n  - Other: other.md\n",
            dir.path(),
        );

        assert!(tree.title_clashes().is_empty());
    }

    #[test]
    fn test_load_missing_paths() {
        let dir = TempDir::new().unwrap();

        let err = NavTree::load(&dir.path().join("mkdocs.yml"), &dir.path().join("docs"))
            .unwrap_err();
        assert!(matches!(err, DocsError::SourceNotFound(_)));

        let err = NavTree::load(&dir.path().join("mkdocs.yml"), dir.path()).unwrap_err();
        assert!(matches!(err, DocsError::NavNotFound(_)));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let nav_file = dir.path().join("mkdocs.yml");
        fs::write(&nav_file, "nav: [unclosed").unwrap();

        let err = NavTree::load(&nav_file, dir.path()).unwrap_err();
        assert!(matches!(err, DocsError::Yaml { .. }));
    }
}
