use anyhow::{Context as _, Result};

use super::Context;

pub async fn migrate(ctx: &Context) -> Result<()> {
    let ledger = ctx.ledger().await?;
    ledger.migrate().await.context("migration failed")?;
    println!("migrations applied");
    Ok(())
}
