//! `cfsync plan` command implementation.

use std::path::PathBuf;

use cfsync_config::{CliSettings, DocsConfig};
use cfsync_confluence::{Ancestors, PageNode, Reconciler, RemoteDirectory};
use cfsync_docs::NavTree;
use clap::Args;

use super::open_session;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the plan command.
#[derive(Args)]
pub(crate) struct PlanArgs {
    /// Path to configuration file (default: auto-discover cfsync.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log progress at INFO level.
    #[arg(short, long)]
    verbose: bool,

    /// Log every remote call at DEBUG level.
    #[arg(long)]
    debug: bool,

    /// Markdown source directory (overrides config).
    #[arg(long)]
    source_dir: Option<PathBuf>,
}

impl PlanArgs {
    /// Execute the plan command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or the nav cannot be loaded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = CliSettings {
            source_dir: self.source_dir,
            dry_run: Some(true),
            verbose: self.verbose.then_some(true),
            debug: self.debug.then_some(true),
        };
        let Some(session) = open_session(self.config.as_deref(), &settings, &output)? else {
            return Ok(());
        };

        let client = session.client.with_dry_run(true);
        let blocked = print_plans(
            &client,
            &session.config.docs_resolved,
            &session.main_parent,
            &output,
        )?;
        if blocked > 0 {
            output.warning(&format!("\n{blocked} page(s) cannot be published as is"));
        }
        Ok(())
    }
}

/// Print each page's plan against the current remote state.
///
/// Plans are computed independently: a parent created by an earlier page's
/// plan still shows up as missing for later pages. Returns the number of
/// pages whose plan could not be computed.
pub(crate) fn print_plans<D: RemoteDirectory + ?Sized>(
    directory: &D,
    docs: &DocsConfig,
    main_parent: &str,
    output: &Output,
) -> Result<usize, CliError> {
    let tree = NavTree::load(&docs.nav_file, &docs.source_dir)?;
    let clashes = tree.title_clashes();
    let reconciler = Reconciler::new(directory, main_parent);

    let mut blocked = 0;
    for page in tree.pages() {
        let indent = "  ".repeat(page.depth);
        if let Some(clash) = clashes.iter().find(|c| c.later == page.source) {
            output.error(&format!(
                "{indent}{} *FAILED*\n{indent}  {} reuses the title of {}",
                page.title,
                clash.later.display(),
                clash.first.display()
            ));
            blocked += 1;
            continue;
        }
        let node = PageNode::new(
            page.title.clone(),
            Ancestors::nearest_first(page.ancestors.iter().map(String::as_str)),
            String::new(),
        );
        match reconciler.plan(&node) {
            Ok(plan) => {
                let tag = if plan.is_update() { "*UPDATE*" } else { "*NEW PAGE*" };
                output.highlight(&format!("{indent}{} {tag}", page.title));
                for step in &plan.steps {
                    output.info(&format!("{indent}  - {step}"));
                }
            }
            Err(err) if err.is_parent_mismatch() => {
                output.warning(&format!("{indent}{} *SKIPPED*\n{indent}  {err}", page.title));
                blocked += 1;
            }
            Err(err) => {
                output.error(&format!("{indent}{} *FAILED*\n{indent}  {err}", page.title));
                blocked += 1;
            }
        }
    }
    Ok(blocked)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use cfsync_confluence::MockDirectory;
    use tempfile::TempDir;

    use super::*;

    fn docs_fixture() -> (TempDir, DocsConfig) {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("guide")).unwrap();
        fs::write(docs.join("index.md"), "# Home\n").unwrap();
        fs::write(docs.join("guide/install.md"), "# Install\n").unwrap();
        fs::write(
            dir.path().join("mkdocs.yml"),
            "nav:\n  - Home: index.md\n  - Guide:\n      - Install: guide/install.md\n",
        )
        .unwrap();
        let config = DocsConfig {
            source_dir: docs,
            nav_file: dir.path().join("mkdocs.yml"),
        };
        (dir, config)
    }

    #[test]
    fn test_plan_never_writes() {
        let (_dir, docs) = docs_fixture();
        let remote = MockDirectory::new().with_page("Docs", None);

        let blocked = print_plans(&remote, &docs, "Docs", &Output::new()).unwrap();

        assert_eq!(blocked, 0);
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_plan_counts_blocked_pages() {
        let (_dir, docs) = docs_fixture();
        let remote = MockDirectory::new()
            .with_page("Archive", None)
            .with_page("Home", Some("Archive"));

        let blocked = print_plans(&remote, &docs, "Docs", &Output::new()).unwrap();

        // Home sits under another parent; Install needs the missing root.
        assert_eq!(blocked, 2);
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_plan_blocks_page_reusing_a_title() {
        let (_dir, docs) = docs_fixture();
        fs::create_dir_all(docs.source_dir.join("extra")).unwrap();
        fs::write(docs.source_dir.join("extra/Home.md"), "Another home\n").unwrap();
        let remote = MockDirectory::new().with_page("Docs", None);

        let blocked = print_plans(&remote, &docs, "Docs", &Output::new()).unwrap();

        assert_eq!(blocked, 1);
    }
}
