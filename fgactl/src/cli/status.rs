use anyhow::Result;
use chrono::Utc;
use fga_core::AttemptLedger;

use super::Context;

pub async fn status(ctx: &Context) -> Result<()> {
    let today = Utc::now().date_naive();
    let ledger = ctx.ledger().await?;
    let summary = ledger.backlog_summary(today).await?;

    println!("backlog for {today}");
    println!("  total:           {}", summary.total);
    println!("  terminal:        {}", summary.terminal);
    println!("  eligible:        {}", summary.eligible);
    println!("  attempted today: {}", summary.attempted_today);
    println!("  in flight:       {}", summary.in_flight);
    Ok(())
}
