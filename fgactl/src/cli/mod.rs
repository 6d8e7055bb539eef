pub mod db;
pub mod groups;
pub mod run;
pub mod status;
pub mod submit;

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use fga_config::{
    Config, ConfigLoad, ConfigLoader, ConfigOverrides, ensure_flickr_ready,
    load_app_credentials, load_user_credentials,
};
use fga_core::PostgresLedger;
use fga_core::flickr::FlickrRestClient;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "fgactl",
    version,
    about = "Submit and process Flickr group-add requests"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Path to fga.toml (defaults to $FGA_CONFIG, ./fga.toml, ./config/fga.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Env file loaded before reading the environment
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    /// Skip loading the env file
    #[arg(long, global = true)]
    pub no_env_file: bool,

    /// Postgres URL; overrides DATABASE_URL and the config file
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Number of requests processed concurrently
    #[arg(long, global = true)]
    pub max_concurrent_requests: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process every request eligible today
    Run(run::RunOptions),
    /// Submit one group-add request
    Submit(submit::SubmitOptions),
    /// Submit every request of a request-set JSON file
    Import(submit::ImportOptions),
    /// List the groups a user can add photos to
    Groups(groups::GroupsOptions),
    /// Show the request backlog for today
    Status,
    /// Close attempts left open by an interrupted run
    Reconcile,
    /// Database maintenance
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbAction {
    /// Apply pending migrations
    Migrate,
}

/// Loaded configuration shared by every command.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
}

impl Context {
    pub fn load(opts: &GlobalOptions) -> Result<Self> {
        let mut loader = ConfigLoader::new()
            .with_env_file((!opts.no_env_file).then(|| opts.env_file.clone()))
            .with_overrides(ConfigOverrides {
                database_url: opts.database_url.clone(),
                max_concurrent_requests: opts.max_concurrent_requests,
                max_requests_per_run: None,
            });
        if let Some(path) = &opts.config {
            loader = loader.with_config_path(path);
        }

        let ConfigLoad { config, warnings } =
            loader.load().context("failed to load configuration")?;
        for warning in &warnings.items {
            match &warning.hint {
                Some(hint) => warn!(hint = %hint, "{}", warning.message),
                None => warn!("{}", warning.message),
            }
        }
        if let Some(path) = &config.metadata.config_path {
            info!(path = %path.display(), "using config file");
        }

        Ok(Self { config })
    }

    pub async fn ledger(&self) -> Result<PostgresLedger> {
        let url = self
            .config
            .database
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("no database URL configured"))?;
        let max_connections =
            u32::try_from(self.config.processor.max_concurrent_requests + 2)
                .unwrap_or(u32::MAX);
        PostgresLedger::connect(url, max_connections)
            .await
            .context("failed to connect to the ledger database")
    }

    pub fn flickr(&self) -> Result<FlickrRestClient> {
        let flickr = &self.config.flickr;
        ensure_flickr_ready(&self.config)?;

        let app_path = flickr
            .app_credentials
            .as_deref()
            .ok_or_else(|| anyhow!("no Flickr app credentials configured"))?;
        let app = load_app_credentials(app_path)?;
        let users = load_user_credentials(&flickr.user_credentials)?;

        FlickrRestClient::new(
            flickr.endpoint.clone(),
            app,
            users,
            flickr.request_timeout,
        )
        .context("failed to build the Flickr client")
    }
}
