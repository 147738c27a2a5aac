//! Settings for a cfsync run.
//!
//! A `cfsync.toml` is read from an explicit path or found by walking up from
//! the working directory. Command-line overrides arrive as [`CliSettings`].
//!
//! ## `${VAR}` placeholders
//!
//! The Confluence section may reference the environment:
//!
//! - `${VAR}` is replaced by VAR and fails when VAR is missing
//! - `${VAR:-fallback}` uses `fallback` when VAR is missing
//!
//! Placeholders are honored in:
//! - `confluence.host_url`
//! - `confluence.space`
//! - `confluence.parent_page_name`
//! - `confluence.username`
//! - `confluence.password`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Command-line overrides layered on top of the file.
///
/// `None` leaves the file value in place.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Markdown root to publish from.
    pub source_dir: Option<PathBuf>,
    /// Force dry-run mode.
    pub dry_run: Option<bool>,
    /// Force verbose logging.
    pub verbose: Option<bool>,
    /// Force debug logging.
    pub debug: Option<bool>,
}

/// File name looked up during discovery.
const CONFIG_FILENAME: &str = "cfsync.toml";

/// Environment variable consulted when `confluence.username` is omitted.
pub const USERNAME_ENV: &str = "JIRA_USERNAME";

/// Environment variable consulted when `confluence.password` is omitted.
pub const PASSWORD_ENV: &str = "JIRA_PASSWORD";

/// Settings for one run.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[docs]` as written, relative to the file.
    docs: DocsConfigRaw,
    /// `[confluence]`, absent when the file has no such table.
    pub confluence: Option<ConfluenceConfig>,
    /// Reconciliation timing configuration.
    pub sync: SyncConfig,

    /// `[docs]` joined onto the config directory.
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// File the settings came from, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// `[docs]` table before path resolution.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    nav_file: Option<String>,
}

/// Documentation locations after resolution.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Root of the markdown tree.
    pub source_dir: PathBuf,
    /// YAML file holding the `nav:` list.
    pub nav_file: PathBuf,
}

/// The `[confluence]` table.
#[derive(Debug, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence base URL.
    pub host_url: String,
    /// Space key every lookup is scoped to.
    pub space: String,
    /// Fallback root ancestor for pages without a local parent.
    #[serde(default)]
    pub parent_page_name: Option<String>,
    /// Basic auth username (falls back to `JIRA_USERNAME`).
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password or API token (falls back to `JIRA_PASSWORD`).
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable that must equal `1` for the run to execute.
    #[serde(default)]
    pub enabled_if_env: Option<String>,
    /// Suppress every mutating call.
    #[serde(default)]
    pub dryrun: bool,
    /// Log progress at info level.
    #[serde(default)]
    pub verbose: bool,
    /// Log every remote call at debug level.
    #[serde(default)]
    pub debug: bool,
}

/// Resolved basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password or API token.
    pub password: String,
}

/// Whether a run should execute, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enablement {
    /// No `enabled_if_env` configured.
    Default,
    /// The gate variable is set to `1`.
    EnabledByEnv(String),
    /// The gate variable is unset or not `1`.
    DisabledByEnv(String),
}

impl Enablement {
    /// Whether the run executes.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::DisabledByEnv(_))
    }
}

impl ConfluenceConfig {
    /// Check the fields every run needs.
    ///
    /// Credentials are not checked here since they may come from the environment;
    /// see [`ConfluenceConfig::credentials`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.host_url, "confluence.host_url")?;
        require_http_url(&self.host_url, "confluence.host_url")?;
        require_non_empty(&self.space, "confluence.space")?;
        if let Some(parent) = &self.parent_page_name {
            require_non_empty(parent, "confluence.parent_page_name")?;
        }
        Ok(())
    }

    /// The ancestor every created top-level page hangs under.
    ///
    /// This is `parent_page_name` when configured, otherwise the space key.
    #[must_use]
    pub fn main_parent(&self) -> &str {
        self.parent_page_name.as_deref().unwrap_or(&self.space)
    }

    /// Resolve credentials, falling back to `JIRA_USERNAME` / `JIRA_PASSWORD`.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    fn credentials_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let username = self
            .username
            .clone()
            .or_else(|| lookup(USERNAME_ENV))
            .unwrap_or_default();
        let password = self
            .password
            .clone()
            .or_else(|| lookup(PASSWORD_ENV))
            .unwrap_or_default();
        require_non_empty(&username, "confluence.username")?;
        require_non_empty(&password, "confluence.password")?;
        Ok(Credentials { username, password })
    }

    /// Evaluate the `enabled_if_env` gate against the process environment.
    #[must_use]
    pub fn enablement(&self) -> Enablement {
        self.enablement_from(|name| std::env::var(name).ok())
    }

    fn enablement_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Enablement {
        match &self.enabled_if_env {
            None => Enablement::Default,
            Some(name) if lookup(name).as_deref() == Some("1") => {
                Enablement::EnabledByEnv(name.clone())
            }
            Some(name) => Enablement::DisabledByEnv(name.clone()),
        }
    }
}

/// Timing of the two waits the reconciliation protocol performs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attempts for a create whose parent was only just created.
    pub create_retries: u32,
    /// Fixed delay between those attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Poll interval while waiting for a created page to become visible, in milliseconds.
    pub visibility_interval_ms: u64,
    /// Maximum number of visibility polls.
    pub visibility_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            create_retries: 10,
            retry_delay_secs: 5,
            visibility_interval_ms: 1000,
            visibility_attempts: 20,
        }
    }
}

impl SyncConfig {
    /// Delay between create retries.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Interval between visibility polls.
    #[must_use]
    pub fn visibility_interval(&self) -> Duration {
        Duration::from_millis(self.visibility_interval_ms)
    }
}

/// Failure to produce usable settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicit config path does not exist.
    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),
    /// Reading the file failed.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for [`Config`].
    #[error("invalid cfsync.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is missing or malformed.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// A `${VAR}` placeholder could not be expanded.
    #[error("cannot expand {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.password`").
        field: String,
        /// Error message (e.g., "${`JIRA_PASSWORD`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Validation(format!("{field} is empty")))
    } else {
        Ok(())
    }
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    match url.split_once("://") {
        Some(("http" | "https", rest)) if !rest.is_empty() => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "{field} needs an http:// or https:// URL, got '{url}'"
        ))),
    }
}

impl Config {
    /// Read settings and layer `overrides` on top.
    ///
    /// An explicit `path` must exist. Without one, `cfsync.toml` is searched
    /// for upward from the working directory, and defaults apply when none
    /// is found.
    ///
    /// # Errors
    ///
    /// Fails when the explicit file is missing, unreadable or invalid.
    pub fn load(path: Option<&Path>, overrides: Option<&CliSettings>) -> Result<Self, ConfigError> {
        let source = match path {
            Some(explicit) if !explicit.exists() => {
                return Err(ConfigError::NotFound(explicit.to_path_buf()));
            }
            Some(explicit) => Some(explicit.to_path_buf()),
            None => Self::discover_config(),
        };
        let mut config = match source {
            Some(file) => Self::load_from_file(&file)?,
            None => Self::default_with_cwd(),
        };
        if let Some(settings) = overrides {
            config.apply_cli_settings(settings);
        }
        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(confluence) = self.confluence.as_mut() {
            if let Some(dry_run) = settings.dry_run {
                confluence.dryrun = dry_run;
            }
            if let Some(verbose) = settings.verbose {
                confluence.verbose = verbose;
            }
            if let Some(debug) = settings.debug {
                confluence.debug = debug;
            }
        }
    }

    /// The `[confluence]` table, checked.
    ///
    /// # Errors
    ///
    /// Fails with `ConfigError::Validation` when the table is absent or invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        let Some(confluence) = self.confluence.as_ref() else {
            return Err(ConfigError::Validation(
                "no [confluence] table in cfsync.toml".to_owned(),
            ));
        };
        confluence.validate()?;
        Ok(confluence)
    }

    fn discover_config() -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        cwd.ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
    }

    fn default_with_cwd() -> Self {
        Self::default_with_base(&std::env::current_dir().unwrap_or_default())
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            confluence: None,
            sync: SyncConfig::default(),
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
                nav_file: base.join("mkdocs.yml"),
            },
            config_path: None,
        }
    }

    fn load_from_file(file: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(&std::fs::read_to_string(file)?)?;
        config.expand_env_vars()?;
        config.resolve_paths(file.parent().unwrap_or(Path::new(".")));
        config.config_path = Some(file.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Check the `[sync]` table.
    ///
    /// The `[confluence]` section is validated lazily by
    /// [`Config::require_confluence`].
    ///
    /// # Errors
    ///
    /// Fails with `ConfigError::Validation` on a zero attempt count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.create_retries == 0 {
            return Err(ConfigError::Validation(
                "sync.create_retries must be greater than 0".to_owned(),
            ));
        }
        if self.sync.visibility_attempts == 0 {
            return Err(ConfigError::Validation(
                "sync.visibility_attempts must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(confluence) = self.confluence.as_mut() {
            confluence.host_url = expand::expand_env(&confluence.host_url, "confluence.host_url")?;
            confluence.space = expand::expand_env(&confluence.space, "confluence.space")?;
            expand::expand_opt(
                &mut confluence.parent_page_name,
                "confluence.parent_page_name",
            )?;
            expand::expand_opt(&mut confluence.username, "confluence.username")?;
            expand::expand_opt(&mut confluence.password, "confluence.password")?;
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |raw: Option<&String>, fallback: &str| {
            base.join(raw.map_or(fallback, String::as_str))
        };
        self.docs_resolved = DocsConfig {
            source_dir: join(self.docs.source_dir.as_ref(), "docs"),
            nav_file: join(self.docs.nav_file.as_ref(), "mkdocs.yml"),
        };
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn confluence_toml() -> &'static str {
        r#"
[confluence]
host_url = "https://wiki.example.com"
space = "DOCS"
parent_page_name = "Documentation"
username = "bot"
password = "secret"
"#
    }

    fn valid_confluence_config() -> ConfluenceConfig {
        ConfluenceConfig {
            host_url: "https://wiki.example.com".to_owned(),
            space: "DOCS".to_owned(),
            parent_page_name: None,
            username: Some("bot".to_owned()),
            password: Some("secret".to_owned()),
            enabled_if_env: None,
            dryrun: false,
            verbose: false,
            debug: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/test/docs"));
        assert_eq!(
            config.docs_resolved.nav_file,
            PathBuf::from("/test/mkdocs.yml")
        );
        assert!(config.confluence.is_none());
        assert_eq!(config.sync.create_retries, 10);
        assert_eq!(config.sync.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.sync.visibility_interval(), Duration::from_secs(1));
        assert_eq!(config.sync.visibility_attempts, 20);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.confluence.is_none());
        assert_eq!(config.sync.create_retries, 10);
    }

    #[test]
    fn test_parse_confluence_config() {
        let config: Config = toml::from_str(confluence_toml()).unwrap();
        let confluence = config.confluence.unwrap();
        assert_eq!(confluence.host_url, "https://wiki.example.com");
        assert_eq!(confluence.space, "DOCS");
        assert_eq!(confluence.parent_page_name.as_deref(), Some("Documentation"));
        assert!(!confluence.dryrun);
        assert!(!confluence.verbose);
        assert!(!confluence.debug);
        assert!(confluence.enabled_if_env.is_none());
    }

    #[test]
    fn test_parse_sync_config() {
        let toml = r"
[sync]
create_retries = 3
retry_delay_secs = 1
visibility_interval_ms = 250
visibility_attempts = 8
";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sync.create_retries, 3);
        assert_eq!(config.sync.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.sync.visibility_interval(), Duration::from_millis(250));
        assert_eq!(config.sync.visibility_attempts, 8);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[docs]
source_dir = "documentation"
nav_file = "site/mkdocs.yml"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/project/documentation")
        );
        assert_eq!(
            config.docs_resolved.nav_file,
            PathBuf::from("/project/site/mkdocs.yml")
        );
    }

    #[test]
    fn test_main_parent_prefers_parent_page_name() {
        let mut conf = valid_confluence_config();
        assert_eq!(conf.main_parent(), "DOCS");

        conf.parent_page_name = Some("Documentation".to_owned());
        assert_eq!(conf.main_parent(), "Documentation");
    }

    #[test]
    fn test_credentials_from_config() {
        let conf = valid_confluence_config();
        let creds = conf.credentials_from(|_| None).unwrap();
        assert_eq!(
            creds,
            Credentials {
                username: "bot".to_owned(),
                password: "secret".to_owned(),
            }
        );
    }

    #[test]
    fn test_credentials_fall_back_to_env() {
        let conf = ConfluenceConfig {
            username: None,
            password: None,
            ..valid_confluence_config()
        };
        let env: HashMap<&str, &str> =
            HashMap::from([(USERNAME_ENV, "env-user"), (PASSWORD_ENV, "env-pass")]);

        let creds = conf
            .credentials_from(|name| env.get(name).map(|v| (*v).to_owned()))
            .unwrap();

        assert_eq!(creds.username, "env-user");
        assert_eq!(creds.password, "env-pass");
    }

    #[test]
    fn test_credentials_missing_password() {
        let conf = ConfluenceConfig {
            password: None,
            ..valid_confluence_config()
        };
        let err = conf.credentials_from(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("confluence.password"));
    }

    #[test]
    fn test_enablement_without_gate() {
        let conf = valid_confluence_config();
        let enablement = conf.enablement_from(|_| None);
        assert_eq!(enablement, Enablement::Default);
        assert!(enablement.is_enabled());
    }

    #[test]
    fn test_enablement_gate_set_to_one() {
        let conf = ConfluenceConfig {
            enabled_if_env: Some("PUBLISH_DOCS".to_owned()),
            ..valid_confluence_config()
        };
        let enablement = conf.enablement_from(|_| Some("1".to_owned()));
        assert_eq!(enablement, Enablement::EnabledByEnv("PUBLISH_DOCS".to_owned()));
        assert!(enablement.is_enabled());
    }

    #[test]
    fn test_enablement_gate_other_value_disables() {
        let conf = ConfluenceConfig {
            enabled_if_env: Some("PUBLISH_DOCS".to_owned()),
            ..valid_confluence_config()
        };
        assert!(!conf.enablement_from(|_| Some("true".to_owned())).is_enabled());
        assert!(!conf.enablement_from(|_| None).is_enabled());
    }

    #[test]
    fn test_apply_cli_settings_overrides_confluence_flags() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.confluence = Some(valid_confluence_config());

        config.apply_cli_settings(&CliSettings {
            dry_run: Some(true),
            debug: Some(true),
            ..Default::default()
        });

        let conf = config.confluence.unwrap();
        assert!(conf.dryrun);
        assert!(conf.debug);
        assert!(!conf.verbose);
    }

    #[test]
    fn test_apply_cli_settings_source_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings {
            source_dir: Some(PathBuf::from("/custom/docs")),
            ..Default::default()
        });

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/custom/docs")
        );
        assert_eq!(
            config.docs_resolved.nav_file,
            PathBuf::from("/test/mkdocs.yml")
        );
    }

    #[test]
    fn test_expand_env_vars_confluence() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("CFSYNC_TEST_HOST", "https://wiki.test.com");
            std::env::set_var("CFSYNC_TEST_PASSWORD", "tok3n");
        }

        let toml = r#"
[confluence]
host_url = "${CFSYNC_TEST_HOST}"
space = "${CFSYNC_TEST_SPACE:-DOCS}"
password = "${CFSYNC_TEST_PASSWORD}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        let confluence = config.confluence.unwrap();
        assert_eq!(confluence.host_url, "https://wiki.test.com");
        assert_eq!(confluence.space, "DOCS");
        assert_eq!(confluence.password.as_deref(), Some("tok3n"));
        assert!(confluence.username.is_none());

        unsafe {
            std::env::remove_var("CFSYNC_TEST_HOST");
            std::env::remove_var("CFSYNC_TEST_PASSWORD");
        }
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.sync.create_retries = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("create_retries"));
    }

    #[test]
    fn test_confluence_validate_invalid_url() {
        let conf = ConfluenceConfig {
            host_url: "wiki.example.com".to_owned(),
            ..valid_confluence_config()
        };
        let err = conf.validate().unwrap_err();
        assert!(err.to_string().contains("host_url"));
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_confluence_validate_empty_space() {
        let conf = ConfluenceConfig {
            space: String::new(),
            ..valid_confluence_config()
        };
        let err = conf.validate().unwrap_err();
        assert!(err.to_string().contains("confluence.space"));
    }

    #[test]
    fn test_require_confluence_missing_section() {
        let config = Config::default_with_base(Path::new("/test"));
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("[confluence]"));
    }

    #[test]
    fn test_load_from_file_resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, confluence_toml()).unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.docs_resolved.source_dir, dir.path().join("docs"));
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert!(config.require_confluence().is_ok());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/cfsync.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
