//! Colored terminal output utilities.

use cfsync_confluence::{AttachmentAction, PageOutcome, PageReport, SyncReport};
use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print the outcome of one page and its attachments.
    pub(crate) fn page(&self, report: &PageReport, depth: usize, progress: (usize, usize)) {
        for line in parent_lines(report, depth, progress.1) {
            self.success(&line);
        }
        let line = page_line(report, depth, progress);
        match &report.outcome {
            PageOutcome::Created { .. } | PageOutcome::Updated { .. } => self.success(&line),
            PageOutcome::Skipped(err) => {
                self.warning(&line);
                self.warning(&format!("      {err}"));
            }
            PageOutcome::Failed(err) => {
                self.error(&line);
                self.error(&format!("      {err}"));
            }
        }

        for attachment in &report.attachments {
            let name = attachment.path.display();
            match &attachment.result {
                Ok(AttachmentAction::Unchanged) => {}
                Ok(action) => self.info(&format!("      attachment {name} {action}")),
                Err(err) => self.error(&format!("      attachment {name} failed: {err}")),
            }
        }
    }

    /// Print run totals.
    pub(crate) fn summary(&self, report: &SyncReport, dry_run: bool) {
        let prefix = if dry_run { "[DRY RUN] " } else { "" };
        self.highlight(&format!(
            "\n{prefix}{} created, {} updated, {} skipped, {} failed",
            report.created(),
            report.updated(),
            report.skipped(),
            report.failed()
        ));
        self.info(&format!(
            "Attachments: {} created, {} updated, {} unchanged, {} failed",
            report.attachments(AttachmentAction::Created),
            report.attachments(AttachmentAction::Updated),
            report.attachments(AttachmentAction::Unchanged),
            report.attachment_failures()
        ));
    }
}

/// Status tag shown after a page title.
pub(crate) fn status_tag(outcome: &PageOutcome) -> &'static str {
    match outcome {
        PageOutcome::Created { .. } => "*NEW PAGE*",
        PageOutcome::Updated { .. } => "*UPDATE*",
        PageOutcome::Skipped(_) => "*SKIPPED*",
        PageOutcome::Failed(_) => "*FAILED*",
    }
}

/// Progress counter, nav-indented title and status tag.
pub(crate) fn page_line(report: &PageReport, depth: usize, (done, total): (usize, usize)) -> String {
    let width = total.to_string().len();
    format!(
        "[{done:>width$}/{total}] {}{} {}",
        "  ".repeat(depth),
        report.title,
        status_tag(&report.outcome)
    )
}

/// One line per ancestor created on the way to the page, outermost first,
/// aligned with [`page_line`] and indented one level per nav step up.
pub(crate) fn parent_lines(report: &PageReport, depth: usize, total: usize) -> Vec<String> {
    let PageOutcome::Created {
        parents_created, ..
    } = &report.outcome
    else {
        return Vec::new();
    };
    let gutter = " ".repeat(2 * total.to_string().len() + 4);
    let count = parents_created.len();
    parents_created
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let level = depth.saturating_sub(count - i);
            format!("{gutter}{}{title} *NEW PAGE*", "  ".repeat(level))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn report(outcome: PageOutcome) -> PageReport {
        PageReport {
            title: "Install".to_owned(),
            outcome,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_page_line_indents_by_depth() {
        let created = report(PageOutcome::Created {
            page_id: Some("42".to_owned()),
            parents_created: Vec::new(),
        });
        assert_eq!(page_line(&created, 2, (3, 12)), "[ 3/12]     Install *NEW PAGE*");
    }

    #[test]
    fn test_created_parents_listed_above_page() {
        let created = report(PageOutcome::Created {
            page_id: None,
            parents_created: vec!["Root".to_owned(), "Guide".to_owned()],
        });

        assert_eq!(
            parent_lines(&created, 2, 12),
            vec![
                "        Root *NEW PAGE*".to_owned(),
                "          Guide *NEW PAGE*".to_owned(),
            ]
        );
        assert_eq!(page_line(&created, 2, (3, 12)), "[ 3/12]     Install *NEW PAGE*");
    }

    #[test]
    fn test_no_parent_lines_for_updates() {
        let updated = report(PageOutcome::Updated {
            page_id: "42".to_owned(),
            version: 3,
        });
        assert!(parent_lines(&updated, 1, 5).is_empty());
    }

    #[test]
    fn test_update_tag() {
        let updated = report(PageOutcome::Updated {
            page_id: "42".to_owned(),
            version: 3,
        });
        assert_eq!(page_line(&updated, 0, (1, 1)), "[1/1] Install *UPDATE*");
    }
}
