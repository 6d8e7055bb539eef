use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use fga_core::run::{execute, reconcile_abandoned};
use tracing::error;

use super::Context;

#[derive(Args, Debug)]
pub struct RunOptions {
    /// Process at most this many requests
    #[arg(long)]
    pub limit: Option<usize>,
}

pub async fn run(ctx: &Context, opts: &RunOptions) -> Result<()> {
    let flickr = ctx.flickr()?;
    let ledger = ctx.ledger().await?;

    let mut options = ctx.config.processor.run_options();
    if opts.limit.is_some() {
        options.max_requests_per_run = opts.limit;
    }

    match execute(Arc::new(ledger), Arc::new(flickr), options).await {
        Ok(stats) => {
            println!("{stats}");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "run aborted");
            println!("{}", err.stats());
            Err(err.into())
        }
    }
}

pub async fn reconcile(ctx: &Context) -> Result<()> {
    let ledger = ctx.ledger().await?;
    let closed = reconcile_abandoned(
        &ledger,
        Utc::now(),
        ctx.config.processor.abandoned_attempt_after,
    )
    .await?;
    println!("closed {closed} abandoned attempt(s)");
    Ok(())
}
