use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{TimeDelta, Utc};
use clap::Args;
use fga_core::AttemptLedger;
use fga_core::import::read_request_set;
use fga_model::{GroupId, NewRequest, PictureId, UserId};
use tracing::info;

use super::Context;

#[derive(Args, Debug)]
pub struct SubmitOptions {
    /// NSID of the user the request is executed for
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub picture: String,
    /// Group NSID
    #[arg(long)]
    pub group: String,
}

#[derive(Args, Debug)]
pub struct ImportOptions {
    /// JSON file of the form {"fga_request_set": {"<picture>": ["<group> name", ...]}}
    pub file: PathBuf,
    /// NSID of the user owning every picture in the file
    #[arg(long)]
    pub user: String,
}

pub async fn submit(ctx: &Context, opts: &SubmitOptions) -> Result<()> {
    let request = NewRequest::new(
        UserId::parse(&opts.user)?,
        PictureId::parse(&opts.picture)?,
        GroupId::parse(&opts.group)?,
    );

    let ledger = ctx.ledger().await?;
    let outcome = ledger.submit(request, Utc::now()).await?;
    if outcome.created {
        println!("submitted {}", outcome.request.id);
    } else {
        println!("already submitted as {}", outcome.request.id);
    }
    Ok(())
}

pub async fn import(ctx: &Context, opts: &ImportOptions) -> Result<()> {
    let user = UserId::parse(&opts.user)?;
    let requests = read_request_set(&opts.file, &user)
        .with_context(|| format!("failed to import {}", opts.file.display()))?;

    let ledger = ctx.ledger().await?;
    let (mut created, mut existing) = (0u64, 0u64);
    // Strictly increasing timestamps keep the file order as submission order.
    let base = Utc::now();
    for (offset, request) in (0i64..).zip(requests) {
        let submitted_at = base + TimeDelta::microseconds(offset);
        let outcome = ledger.submit(request, submitted_at).await?;
        if outcome.created {
            created += 1;
        } else {
            existing += 1;
        }
    }

    info!(file = %opts.file.display(), created, existing, "imported request set");
    println!("created={created} existing={existing}");
    Ok(())
}
