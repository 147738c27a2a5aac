//! Reconciliation plans.

use std::fmt;

use super::NominalParents;
use crate::directory::PageId;

/// Parent a create step attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// Page confirmed to exist remotely.
    Existing(PageId),
    /// Page created by an earlier step of the same plan.
    Planned(String),
}

/// One remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Create a missing ancestor with a placeholder body.
    CreateParent {
        /// Ancestor title.
        title: String,
        /// Where to attach it.
        parent: ParentRef,
    },
    /// Create the target page with its rendered body.
    CreatePage {
        /// Page title.
        title: String,
        /// Where to attach it.
        parent: ParentRef,
    },
    /// Publish the rendered body of an existing page.
    UpdatePage {
        /// Remote page.
        page_id: PageId,
        /// Page title.
        title: String,
        /// New version (current plus one).
        version: u32,
    },
}

/// Ordered writes needed to bring one page in line with the local tree.
///
/// Ancestors always precede descendants. Never persisted; recomputed every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Target page title.
    pub title: String,
    /// Anchor chain the plan was computed against.
    pub parents: NominalParents,
    /// Steps in execution order.
    pub steps: Vec<PlanStep>,
}

impl ReconciliationPlan {
    /// Whether the plan updates an existing page.
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self.steps.as_slice(), [PlanStep::UpdatePage { .. }])
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing(id) => write!(f, "id {id}"),
            Self::Planned(title) => write!(f, "new page '{title}'"),
        }
    }
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateParent { title, parent } => {
                write!(f, "create parent '{title}' under {parent}")
            }
            Self::CreatePage { title, parent } => write!(f, "create '{title}' under {parent}"),
            Self::UpdatePage {
                page_id,
                title,
                version,
            } => write!(f, "update '{title}' (id {page_id}) to v{version}"),
        }
    }
}
