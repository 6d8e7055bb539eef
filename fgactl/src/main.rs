use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Command, DbAction};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = cli::Context::load(&cli.global)?;

    match cli.command {
        Command::Run(opts) => cli::run::run(&ctx, &opts).await,
        Command::Submit(opts) => cli::submit::submit(&ctx, &opts).await,
        Command::Import(opts) => cli::submit::import(&ctx, &opts).await,
        Command::Groups(opts) => cli::groups::list_groups(&ctx, &opts).await,
        Command::Status => cli::status::status(&ctx).await,
        Command::Reconcile => cli::run::reconcile(&ctx).await,
        Command::Db { action } => match action {
            DbAction::Migrate => cli::db::migrate(&ctx).await,
        },
    }
}
