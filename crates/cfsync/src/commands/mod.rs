//! CLI command implementations.

pub(crate) mod plan;
pub(crate) mod sync;

use std::path::Path;

use cfsync_config::{CliSettings, Config, ConfluenceConfig, Enablement};
use cfsync_confluence::{ConfluenceClient, RetryPolicy};
use tracing::info;

use crate::error::CliError;
use crate::init_tracing;
use crate::output::Output;

pub(crate) use plan::PlanArgs;
pub(crate) use sync::SyncArgs;

/// Everything a command needs to talk to the space.
pub(crate) struct Session {
    pub(crate) config: Config,
    pub(crate) client: ConfluenceClient,
    pub(crate) main_parent: String,
    pub(crate) dry_run: bool,
    pub(crate) policy: RetryPolicy,
}

/// Load configuration, initialize logging and build the client.
///
/// Returns `None` when the `enabled_if_env` gate disables the run.
pub(crate) fn open_session(
    config_path: Option<&Path>,
    settings: &CliSettings,
    output: &Output,
) -> Result<Option<Session>, CliError> {
    let config = Config::load(config_path, Some(settings))?;
    let confluence = require_confluence_config(&config, output)?;
    init_tracing(confluence.debug, confluence.verbose);

    match confluence.enablement() {
        Enablement::DisabledByEnv(var) => {
            output.warning(&format!(
                "Publishing disabled: set {var}=1 to enable it"
            ));
            return Ok(None);
        }
        Enablement::EnabledByEnv(var) => info!(var = %var, "Publishing enabled by environment"),
        Enablement::Default => {}
    }

    let credentials = confluence.credentials()?;
    let client = ConfluenceClient::from_config(
        &confluence.host_url,
        &confluence.space,
        &credentials.username,
        &credentials.password,
    )
    .with_dry_run(confluence.dryrun);

    let main_parent = confluence.main_parent().to_owned();
    let dry_run = confluence.dryrun;
    let policy = RetryPolicy::from(&config.sync);
    Ok(Some(Session {
        config,
        client,
        main_parent,
        dry_run,
        policy,
    }))
}

fn require_confluence_config<'a>(
    config: &'a Config,
    output: &Output,
) -> Result<&'a ConfluenceConfig, CliError> {
    if config.confluence.is_none() {
        output.error("Error: confluence configuration required in cfsync.toml");
        output.info("\nAdd the following to your cfsync.toml:");
        output.info("\n[confluence]");
        output.info(r#"host_url = "https://wiki.example.com""#);
        output.info(r#"space = "DOCS""#);
        output.info(r#"parent_page_name = "Documentation""#);
    }
    Ok(config.require_confluence()?)
}
