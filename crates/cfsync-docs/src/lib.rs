//! Documentation sources for cfsync.
//!
//! Provides the collaborators the reconciliation protocol consumes:
//! - [`NavTree`]: typed navigation tree read from an mkdocs-style `nav:` list
//! - [`PageRenderer`]: markdown to Confluence storage markup, with attachment
//!   discovery and inter-page link rewriting
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use cfsync_docs::{NavTree, PageRenderer};
//!
//! let tree = NavTree::load(Path::new("mkdocs.yml"), Path::new("docs"))?;
//! let renderer = PageRenderer::new(&tree, Path::new("docs"));
//! for page in tree.pages() {
//!     let rendered = renderer.render(&page)?;
//!     println!("{}: {} attachments", page.title, rendered.attachments.len());
//! }
//! ```

mod error;
mod nav;
mod render;
mod title;

pub use error::DocsError;
pub use nav::{NavNode, NavPage, NavTree, TitleClash};
pub use render::{LinkResolver, PageRenderer, RenderedPage};
