//! Reconciliation driver.
//!
//! [`Reconciler`] executes each page's [`ReconciliationPlan`] in navigation
//! order. Created pages are polled until visible before anything references
//! them, and a create under a freshly created parent is retried while the
//! remote answers as if the parent did not exist and lookup cannot see it
//! either. Every other failure aborts only the current page.

mod error;
mod report;

use std::collections::HashMap;

use tracing::{debug, info, warn};

pub use error::{PageError, SyncError};
pub use report::{PageOutcome, PageReport, SyncContext, SyncReport};

use crate::attachments::AttachmentSynchronizer;
use crate::directory::{PageId, RemoteDirectory};
use crate::error::ConfluenceError;
use crate::hierarchy::{
    HierarchyResolver, PageNode, ParentRef, PlanStep, ReconciliationPlan, Stage, placeholder_body,
};
use crate::wait::RetryPolicy;

/// Drives pages through the reconciliation protocol.
pub struct Reconciler<'a, D: ?Sized> {
    directory: &'a D,
    main_parent: String,
    policy: RetryPolicy,
}

impl<'a, D: RemoteDirectory + ?Sized> Reconciler<'a, D> {
    /// Create a reconciler rooted at `main_parent` with the default retry policy.
    pub fn new(directory: &'a D, main_parent: impl Into<String>) -> Self {
        Self {
            directory,
            main_parent: main_parent.into(),
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Compute a page's plan without writing anything.
    ///
    /// # Errors
    ///
    /// Returns the [`PageError`] that would stop the page.
    pub fn plan(&self, node: &PageNode) -> Result<ReconciliationPlan, PageError> {
        HierarchyResolver::new(self.directory, &self.main_parent).resolve(node)
    }

    /// Reconcile every page in order.
    pub fn run(&self, nodes: &[PageNode]) -> SyncReport {
        let mut context = SyncContext::new(nodes.len());
        for node in nodes {
            self.reconcile(node, &mut context);
        }
        context.finish()
    }

    /// Reconcile one page and its attachments, recording the outcome.
    pub fn reconcile<'c>(&self, node: &PageNode, context: &'c mut SyncContext) -> &'c PageReport {
        let (done, total) = context.progress();
        info!(title = %node.title, page = done + 1, total, "Reconciling page");

        let outcome = match self.execute(node) {
            Ok(outcome) => outcome,
            Err(err) if err.is_parent_mismatch() => {
                warn!(title = %err.title, parent = %err.parent, "Skipped: {}", err.source);
                PageOutcome::Skipped(err)
            }
            Err(err) => {
                warn!(title = %err.title, parent = %err.parent, stage = %err.stage, "Failed: {}", err.source);
                PageOutcome::Failed(err)
            }
        };

        let attachments = match outcome.page_id() {
            Some(page_id) if !node.attachments.is_empty() => {
                AttachmentSynchronizer::new(self.directory).sync_page(page_id, &node.attachments)
            }
            _ => Vec::new(),
        };
        for attachment in &attachments {
            if let Err(err) = &attachment.result {
                warn!(title = %node.title, path = %attachment.path.display(), "Attachment failed: {err}");
            }
        }

        context.record(PageReport {
            title: node.title.clone(),
            outcome,
            attachments,
        })
    }

    fn execute(&self, node: &PageNode) -> Result<PageOutcome, PageError> {
        let plan = self.plan(node)?;
        let fail = |stage: Stage, source: SyncError| PageError {
            title: node.title.clone(),
            parent: plan.parents.parent0.clone(),
            stage,
            source,
        };

        let mut created: HashMap<&str, PageId> = HashMap::new();
        let mut parents_created = Vec::new();
        let mut page_id = None;

        for step in &plan.steps {
            match step {
                PlanStep::UpdatePage {
                    page_id,
                    title,
                    version,
                } => {
                    self.directory
                        .update_page(page_id, title, &node.body, *version)
                        .map_err(|e| fail(Stage::UpdatePath, e.into()))?;
                    info!(title = %title, page_id = %page_id, version, "Updated page");
                    return Ok(PageOutcome::Updated {
                        page_id: page_id.clone(),
                        version: *version,
                    });
                }
                PlanStep::CreateParent { title, parent } => {
                    let id = self
                        .create(title, parent, &placeholder_body(title), &created)
                        .map_err(|e| fail(Stage::CreatePath, e))?;
                    if let Some(id) = id {
                        created.insert(title, id);
                    }
                    parents_created.push(title.clone());
                }
                PlanStep::CreatePage { title, parent } => {
                    page_id = self
                        .create(title, parent, &node.body, &created)
                        .map_err(|e| fail(Stage::CreatePath, e))?;
                }
            }
        }

        Ok(PageOutcome::Created {
            page_id,
            parents_created,
        })
    }

    /// Create `title` under `parent` and wait until it is visible.
    ///
    /// Returns `None` when nothing was written (dry-run).
    fn create(
        &self,
        title: &str,
        parent: &ParentRef,
        body: &str,
        created: &HashMap<&str, PageId>,
    ) -> Result<Option<PageId>, SyncError> {
        let returned = match parent {
            ParentRef::Existing(parent_id) => {
                self.directory.create_page(title, parent_id, body)?
            }
            ParentRef::Planned(parent_title) => {
                let Some(parent_id) = created.get(parent_title.as_str()) else {
                    info!(title, parent = %parent_title, "Dry run: would create page under new parent");
                    return Ok(None);
                };
                self.create_under_fresh_parent(title, parent_title, parent_id.clone(), body)?
            }
        };

        let Some(returned) = returned else {
            info!(title, parent = %parent, "Dry run: would create page");
            return Ok(None);
        };
        info!(title, page_id = %returned, parent = %parent, "Created page");
        Ok(Some(self.await_visible(title, returned)?))
    }

    /// Create under a parent that may not be visible yet, retrying while the
    /// remote rejects the parent and re-resolving its id between attempts.
    ///
    /// Once lookup sees the parent, a rejection is about the page itself and
    /// is returned without further attempts.
    fn create_under_fresh_parent(
        &self,
        title: &str,
        parent_title: &str,
        mut parent_id: PageId,
        body: &str,
    ) -> Result<Option<PageId>, SyncError> {
        let mut last_error = None;
        let result = self.policy.create.until(|attempt| -> Result<_, SyncError> {
            let mut parent_visible = false;
            if attempt > 1
                && let Some(id) = self.directory.find_page_id(parent_title)?
            {
                parent_id = id;
                parent_visible = true;
            }
            match self.directory.create_page(title, &parent_id, body) {
                Ok(id) => Ok(Some(id)),
                Err(err) if err.may_be_missing_parent() && !parent_visible => {
                    debug!(title, parent = parent_title, attempt, "Parent not usable yet: {err}");
                    last_error = Some(err);
                    Ok(None)
                }
                Err(err) => Err(err.into()),
            }
        })?;

        result.ok_or_else(|| SyncError::ParentUnavailable {
            parent: parent_title.to_owned(),
            attempts: self.policy.create.max_attempts.max(1),
            source: last_error.unwrap_or_else(|| {
                ConfluenceError::UnexpectedResponse(format!(
                    "parent '{parent_title}' never accepted a child"
                ))
            }),
        })
    }

    /// Poll until `title` resolves, falling back to the id the create returned.
    fn await_visible(&self, title: &str, returned: PageId) -> Result<PageId, SyncError> {
        let seen = self.policy.visibility.until(|attempt| {
            let id = self.directory.find_page_id(title)?;
            if id.is_none() {
                debug!(title, attempt, "Page not visible yet");
            }
            Ok::<_, ConfluenceError>(id)
        })?;

        Ok(seen.unwrap_or_else(|| {
            warn!(
                title,
                attempts = self.policy.visibility.max_attempts,
                "Page still not visible, using id returned by create"
            );
            returned
        }))
    }
}
