//! Page hierarchy model and resolution.
//!
//! A [`PageNode`] knows at most its two nearest local ancestors. From those and
//! the configured main parent, [`NominalParents`] names the anchor chain a page
//! is created under, and [`HierarchyResolver`] turns remote lookups into an
//! ordered [`ReconciliationPlan`].

mod plan;
mod resolver;

use std::fmt;
use std::path::PathBuf;

pub use plan::{ParentRef, PlanStep, ReconciliationPlan};
pub use resolver::HierarchyResolver;

/// Body used for intermediate ancestors that have no local content.
#[must_use]
pub fn placeholder_body(title: &str) -> String {
    format!("<p> {title} </p>")
}

/// The known local ancestors of a page, nearest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Ancestors {
    /// Top-level page.
    #[default]
    None,
    /// Only the direct parent is known.
    One(String),
    /// Direct parent and grandparent.
    Two(String, String),
}

impl Ancestors {
    /// Build from titles ordered nearest first, keeping the two nearest.
    pub fn nearest_first<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut titles = titles.into_iter().map(Into::into);
        match (titles.next(), titles.next()) {
            (None, _) => Self::None,
            (Some(parent), None) => Self::One(parent),
            (Some(parent), Some(grandparent)) => Self::Two(parent, grandparent),
        }
    }

    /// Direct parent title.
    #[must_use]
    pub fn nearest(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::One(parent) | Self::Two(parent, _) => Some(parent),
        }
    }

    /// Grandparent title.
    #[must_use]
    pub fn second(&self) -> Option<&str> {
        match self {
            Self::Two(_, grandparent) => Some(grandparent),
            _ => None,
        }
    }
}

/// A local page to reconcile. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    /// Title, unique within the space.
    pub title: String,
    /// Known local ancestors.
    pub ancestors: Ancestors,
    /// Rendered storage-format body.
    pub body: String,
    /// Deduplicated local files referenced by the body.
    pub attachments: Vec<PathBuf>,
}

impl PageNode {
    /// Create a page node without attachments.
    pub fn new(title: impl Into<String>, ancestors: Ancestors, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ancestors,
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    /// Attach local files, dropping duplicates while keeping first-seen order.
    #[must_use]
    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = PathBuf>) -> Self {
        for path in attachments {
            if !self.attachments.contains(&path) {
                self.attachments.push(path);
            }
        }
        self
    }
}

/// The anchor chain a page is created under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominalParents {
    /// Nearest ancestor, or the main parent for top-level pages.
    /// The only parent enforced on update.
    pub parent0: String,
    /// Second-nearest ancestor, or the main parent.
    pub parent1: String,
    /// Configured root (`parent_page_name`, else the space key).
    pub main_parent: String,
}

impl NominalParents {
    /// Resolve the nominal parents of a page.
    #[must_use]
    pub fn resolve(ancestors: &Ancestors, main_parent: &str) -> Self {
        Self {
            parent0: ancestors.nearest().unwrap_or(main_parent).to_owned(),
            parent1: ancestors.second().unwrap_or(main_parent).to_owned(),
            main_parent: main_parent.to_owned(),
        }
    }
}

/// Progress of a single page through the reconciliation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing resolved yet.
    Start,
    /// Nearest parent named.
    Parent0Resolved,
    /// Second parent named.
    Parent1Resolved,
    /// Target page looked up.
    TargetLookedUp,
    /// Page exists remotely; checking parent and updating.
    UpdatePath,
    /// Page missing remotely; creating ancestors and the page.
    CreatePath,
    /// Finished.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Parent0Resolved => "parent0 resolved",
            Self::Parent1Resolved => "parent1 resolved",
            Self::TargetLookedUp => "target looked up",
            Self::UpdatePath => "update path",
            Self::CreatePath => "create path",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
