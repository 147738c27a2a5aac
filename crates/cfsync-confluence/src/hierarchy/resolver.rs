//! Hierarchy resolver.

use tracing::debug;

use super::{NominalParents, PageNode, ParentRef, PlanStep, ReconciliationPlan, Stage};
use crate::directory::RemoteDirectory;
use crate::sync::{PageError, SyncError};

/// Decides what remote state must exist before a page can be written.
///
/// Only performs lookups; never writes.
pub struct HierarchyResolver<'a, D: ?Sized> {
    directory: &'a D,
    main_parent: &'a str,
}

impl<'a, D: RemoteDirectory + ?Sized> HierarchyResolver<'a, D> {
    /// Create a resolver anchored at `main_parent`.
    #[must_use]
    pub fn new(directory: &'a D, main_parent: &'a str) -> Self {
        Self {
            directory,
            main_parent,
        }
    }

    /// Compute the plan for one page.
    ///
    /// # Errors
    ///
    /// - [`SyncError::ParentMismatch`] when the page exists under another parent
    /// - [`SyncError::MissingRoot`] when ancestors must be created but the main
    ///   parent cannot be found
    /// - [`SyncError::Remote`] when a lookup fails
    pub fn resolve(&self, node: &PageNode) -> Result<ReconciliationPlan, PageError> {
        let parents = NominalParents::resolve(&node.ancestors, self.main_parent);
        debug!(
            title = %node.title,
            parent0 = %parents.parent0,
            parent1 = %parents.parent1,
            main_parent = %parents.main_parent,
            "Resolved nominal parents"
        );

        let fail = |stage: Stage, source: SyncError| PageError {
            title: node.title.clone(),
            parent: parents.parent0.clone(),
            stage,
            source,
        };

        let target = self
            .directory
            .find_page_id(&node.title)
            .map_err(|e| fail(Stage::Parent1Resolved, e.into()))?;

        let steps = match target {
            Some(page_id) => {
                debug!(title = %node.title, page_id = %page_id, "Page exists, taking update path");
                self.update_steps(node, &parents, page_id)
                    .map_err(|e| fail(Stage::UpdatePath, e))?
            }
            None => {
                debug!(title = %node.title, "Page missing, taking create path");
                self.create_steps(node, &parents)
                    .map_err(|e| fail(Stage::CreatePath, e))?
            }
        };

        Ok(ReconciliationPlan {
            title: node.title.clone(),
            parents,
            steps,
        })
    }

    fn update_steps(
        &self,
        node: &PageNode,
        parents: &NominalParents,
        page_id: String,
    ) -> Result<Vec<PlanStep>, SyncError> {
        let remote_parent = self.directory.find_parent_title(&page_id)?;
        if remote_parent.as_deref() != Some(parents.parent0.as_str()) {
            return Err(SyncError::ParentMismatch {
                expected: parents.parent0.clone(),
                actual: remote_parent,
            });
        }

        let version = self
            .directory
            .find_page_version(&node.title)?
            .ok_or(SyncError::PageVanished)?;

        Ok(vec![PlanStep::UpdatePage {
            page_id,
            title: node.title.clone(),
            version: version + 1,
        }])
    }

    fn create_steps(
        &self,
        node: &PageNode,
        parents: &NominalParents,
    ) -> Result<Vec<PlanStep>, SyncError> {
        let mut steps = Vec::new();

        let parent0 = match self.directory.find_page_id(&parents.parent0)? {
            Some(id) => ParentRef::Existing(id),
            None => {
                let parent1 = match self.directory.find_page_id(&parents.parent1)? {
                    Some(id) => ParentRef::Existing(id),
                    None => {
                        let main_id = self
                            .directory
                            .find_page_id(&parents.main_parent)?
                            .ok_or_else(|| SyncError::MissingRoot {
                                root: parents.main_parent.clone(),
                            })?;
                        steps.push(PlanStep::CreateParent {
                            title: parents.parent1.clone(),
                            parent: ParentRef::Existing(main_id),
                        });
                        ParentRef::Planned(parents.parent1.clone())
                    }
                };
                steps.push(PlanStep::CreateParent {
                    title: parents.parent0.clone(),
                    parent: parent1,
                });
                ParentRef::Planned(parents.parent0.clone())
            }
        };

        steps.push(PlanStep::CreatePage {
            title: node.title.clone(),
            parent: parent0,
        });
        Ok(steps)
    }
}
