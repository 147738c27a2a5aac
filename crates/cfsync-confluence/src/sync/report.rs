//! Per-page outcomes and run summary.

use crate::attachments::{AttachmentAction, AttachmentReport};
use crate::directory::PageId;

use super::PageError;

/// Result of reconciling one page.
#[derive(Debug)]
pub enum PageOutcome {
    /// Page created. `page_id` is `None` in dry-run mode.
    Created {
        /// New page id.
        page_id: Option<PageId>,
        /// Ancestors created first, outermost first.
        parents_created: Vec<String>,
    },
    /// Existing page updated.
    Updated {
        /// Page id.
        page_id: PageId,
        /// Version written.
        version: u32,
    },
    /// Left untouched because it lives under another parent.
    Skipped(PageError),
    /// Aborted.
    Failed(PageError),
}

impl PageOutcome {
    /// Remote id of the page, when known.
    #[must_use]
    pub fn page_id(&self) -> Option<&str> {
        match self {
            Self::Created { page_id, .. } => page_id.as_deref(),
            Self::Updated { page_id, .. } => Some(page_id),
            Self::Skipped(_) | Self::Failed(_) => None,
        }
    }

    /// Error behind a skip or failure.
    #[must_use]
    pub fn error(&self) -> Option<&PageError> {
        match self {
            Self::Skipped(err) | Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Everything that happened to one page.
#[derive(Debug)]
pub struct PageReport {
    /// Page title.
    pub title: String,
    /// Page outcome.
    pub outcome: PageOutcome,
    /// Per-file attachment outcomes.
    pub attachments: Vec<AttachmentReport>,
}

/// Run-scoped state passed through the driver.
#[derive(Debug, Default)]
pub struct SyncContext {
    total: usize,
    reports: Vec<PageReport>,
}

impl SyncContext {
    /// Context for a run over `total` pages.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            reports: Vec::with_capacity(total),
        }
    }

    /// Pages finished so far and the total.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        (self.reports.len(), self.total)
    }

    pub(crate) fn record(&mut self, report: PageReport) -> &PageReport {
        self.reports.push(report);
        &self.reports[self.reports.len() - 1]
    }

    /// Finish the run.
    #[must_use]
    pub fn finish(self) -> SyncReport {
        SyncReport {
            pages: self.reports,
        }
    }
}

/// Summary of a run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Page reports in processing order.
    pub pages: Vec<PageReport>,
}

impl SyncReport {
    /// Pages created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::Created { .. }))
    }

    /// Pages updated.
    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::Updated { .. }))
    }

    /// Pages skipped on parent mismatch.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::Skipped(_)))
    }

    /// Pages that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::Failed(_)))
    }

    /// Attachments that ended with `action`.
    #[must_use]
    pub fn attachments(&self, action: AttachmentAction) -> usize {
        self.attachment_results()
            .filter(|r| matches!(r, Ok(a) if *a == action))
            .count()
    }

    /// Attachments that failed.
    #[must_use]
    pub fn attachment_failures(&self) -> usize {
        self.attachment_results().filter(|r| r.is_err()).count()
    }

    /// Whether any page or attachment failed. Skips do not count.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.attachment_failures() > 0
    }

    fn count(&self, predicate: impl Fn(&PageOutcome) -> bool) -> usize {
        self.pages.iter().filter(|p| predicate(&p.outcome)).count()
    }

    fn attachment_results(
        &self,
    ) -> impl Iterator<Item = &Result<AttachmentAction, super::SyncError>> {
        self.pages
            .iter()
            .flat_map(|p| p.attachments.iter().map(|a| &a.result))
    }
}
