//! `cfsync sync` command implementation.

use std::path::PathBuf;

use cfsync_config::{CliSettings, DocsConfig};
use cfsync_confluence::{
    Ancestors, PageNode, Reconciler, RemoteDirectory, RetryPolicy, SyncContext, SyncReport,
};
use cfsync_docs::{LinkResolver, NavTree, PageRenderer};
use clap::Args;
use tracing::warn;

use super::open_session;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    /// Path to configuration file (default: auto-discover cfsync.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report what would change without writing to Confluence.
    #[arg(long)]
    dry_run: bool,

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

impl SyncArgs {
    /// Execute the sync command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or the nav cannot be loaded, or if
    /// any page or attachment failed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = CliSettings {
            source_dir: self.source_dir,
            dry_run: self.dry_run.then_some(true),
            verbose: self.verbose.then_some(true),
            debug: self.debug.then_some(true),
        };
        let Some(session) = open_session(self.config.as_deref(), &settings, &output)? else {
            return Ok(());
        };

        if session.dry_run {
            output.highlight("[DRY RUN] No changes will be made.");
        }
        let page_url = |id: &str| session.client.page_url(id);
        let outcome = publish(
            &session.client,
            &session.config.docs_resolved,
            &session.main_parent,
            session.policy,
            &page_url,
            &output,
        )?;
        output.summary(&outcome.report, session.dry_run);
        outcome.into_result()
    }
}

/// Result of publishing a tree.
pub(crate) struct Published {
    pub(crate) report: SyncReport,
    /// Pages rejected locally (unrenderable or reusing a title) and never
    /// reconciled.
    pub(crate) local_failures: usize,
}

impl Published {
    fn into_result(self) -> Result<(), CliError> {
        let failed = self.report.failed() + self.local_failures;
        if failed > 0 || self.report.has_failures() {
            return Err(CliError::Failures {
                failed,
                total: self.report.pages.len() + self.local_failures,
            });
        }
        Ok(())
    }
}

/// Render every nav page and reconcile it against `directory` in nav order.
pub(crate) fn publish<D: RemoteDirectory + ?Sized>(
    directory: &D,
    docs: &DocsConfig,
    main_parent: &str,
    policy: RetryPolicy,
    page_url: &dyn Fn(&str) -> String,
    output: &Output,
) -> Result<Published, CliError> {
    let tree = NavTree::load(&docs.nav_file, &docs.source_dir)?;
    let links = RemoteLinks {
        directory,
        page_url,
    };
    let renderer = PageRenderer::new(&tree, &docs.source_dir).with_links(&links);
    let reconciler = Reconciler::new(directory, main_parent).with_policy(policy);

    let pages = tree.pages();
    output.info(&format!(
        "Publishing {} page(s) under '{main_parent}'",
        pages.len()
    ));

    let clashes = tree.title_clashes();
    let mut context = SyncContext::new(pages.len());
    let mut local_failures = 0;
    for (index, page) in pages.iter().enumerate() {
        if let Some(clash) = clashes.iter().find(|c| c.later == page.source) {
            output.error(&format!(
                "{} *FAILED*\n      {} reuses the title of {}",
                page.title,
                clash.later.display(),
                clash.first.display()
            ));
            local_failures += 1;
            continue;
        }
        let rendered = match renderer.render(page) {
            Ok(rendered) => rendered,
            Err(err) => {
                output.error(&format!("{} *FAILED*\n      {err}", page.title));
                local_failures += 1;
                continue;
            }
        };
        let node = PageNode::new(
            page.title.clone(),
            Ancestors::nearest_first(page.ancestors.iter().map(String::as_str)),
            rendered.body,
        )
        .with_attachments(rendered.attachments);

        let report = reconciler.reconcile(&node, &mut context);
        output.page(report, page.depth, (index + 1, pages.len()));
    }

    Ok(Published {
        report: context.finish(),
        local_failures,
    })
}

/// Resolves local page links to URLs of pages that already exist remotely.
struct RemoteLinks<'a, D: ?Sized> {
    directory: &'a D,
    page_url: &'a dyn Fn(&str) -> String,
}

impl<D: RemoteDirectory + ?Sized> LinkResolver for RemoteLinks<'_, D> {
    fn resolve(&self, title: &str) -> Option<String> {
        match self.directory.find_page_id(title) {
            Ok(id) => id.map(|id| (self.page_url)(&id)),
            Err(err) => {
                warn!(title, "Could not resolve page link: {err}");
                None
            }
        }
    }
}
