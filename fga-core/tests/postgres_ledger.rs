#![cfg(feature = "postgres")]

use std::sync::Arc;

use anyhow::Result;
use fga_core::ledger::{AttemptLedger, PostgresLedger};
use fga_core::run::{ABANDONED_DETAIL, RunOptions, execute};
use fga_core::LedgerError;
use fga_model::{AttemptStatus, BacklogSummary};
use sqlx::PgPool;

#[path = "support/mod.rs"]
mod support;

use support::{FakeFlickr, at, clock_at, date, noon, request};

#[sqlx::test(migrator = "fga_core::MIGRATOR")]
async fn submit_is_idempotent_per_triple(pool: PgPool) -> Result<()> {
    let ledger = PostgresLedger::from_pool(pool).await?;

    let first = ledger.submit(request("u1@N00", "p1", "g1@N01"), noon(1)).await?;
    let again = ledger.submit(request("u1@N00", "p1", "g1@N01"), noon(2)).await?;
    let other = ledger.submit(request("u1@N00", "p1", "g2@N01"), noon(2)).await?;

    assert!(first.created);
    assert!(!again.created);
    assert_eq!(first.request.id, again.request.id);
    assert_eq!(again.request.submitted_at, noon(1));
    assert_ne!(other.request.id, first.request.id);
    Ok(())
}

#[sqlx::test(migrator = "fga_core::MIGRATOR")]
async fn eligibility_follows_daily_and_permanent_rules(pool: PgPool) -> Result<()> {
    let ledger = PostgresLedger::from_pool(pool).await?;
    let throttled = ledger
        .submit(request("u1@N00", "p1", "g1@N01"), at(1, 8))
        .await?
        .request;
    let added = ledger
        .submit(request("u1@N00", "p2", "g1@N01"), at(1, 9))
        .await?
        .request;
    let fresh = ledger
        .submit(request("u1@N00", "p3", "g1@N01"), at(1, 10))
        .await?
        .request;

    let attempt = ledger.open_attempt(throttled.id, noon(1)).await?;
    ledger
        .close_attempt(attempt.id, noon(1), &AttemptStatus::GroupThrottled)
        .await?;
    let attempt = ledger.open_attempt(added.id, noon(1)).await?;
    ledger
        .close_attempt(attempt.id, noon(1), &AttemptStatus::Added)
        .await?;

    let day_one: Vec<_> = ledger
        .eligible_requests(date(1), None)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(day_one, vec![fresh.id]);

    let day_two: Vec<_> = ledger
        .eligible_requests(date(2), None)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(day_two, vec![throttled.id, fresh.id]);

    let limited = ledger.eligible_requests(date(2), Some(1)).await?;
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, throttled.id);

    let summary = ledger.backlog_summary(date(1)).await?;
    assert_eq!(
        summary,
        BacklogSummary {
            total: 3,
            terminal: 1,
            eligible: 1,
            attempted_today: 1,
            in_flight: 0,
        }
    );
    Ok(())
}

#[sqlx::test(migrator = "fga_core::MIGRATOR")]
async fn ledger_refuses_second_open_and_post_terminal_attempts(
    pool: PgPool,
) -> Result<()> {
    let ledger = PostgresLedger::from_pool(pool).await?;
    let req = ledger
        .submit(request("u1@N00", "p1", "g1@N01"), noon(1))
        .await?
        .request;

    let open = ledger.open_attempt(req.id, noon(1)).await?;
    let err = ledger.open_attempt(req.id, noon(1)).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(ledger.eligible_requests(date(5), None).await?.is_empty());

    ledger
        .close_attempt(open.id, noon(1), &AttemptStatus::UserNotInGroup)
        .await?;
    let err = ledger.open_attempt(req.id, noon(2)).await.unwrap_err();
    assert!(err.is_conflict());

    let err = ledger
        .close_attempt(open.id, noon(2), &AttemptStatus::Added)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AttemptNotOpen(_)));

    let history = ledger.attempts_for(req.id).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].final_status, Some(AttemptStatus::UserNotInGroup));
    Ok(())
}

#[sqlx::test(migrator = "fga_core::MIGRATOR")]
async fn full_run_against_postgres(pool: PgPool) -> Result<()> {
    let ledger = Arc::new(PostgresLedger::from_pool(pool).await?);
    let flickr = Arc::new(
        FakeFlickr::new()
            .with_member("u1@N00", &["g1@N01", "g2@N01"])
            .failing_add("p2", "g2@N01", 5, "Photo limit reached"),
    );
    ledger.submit(request("u1@N00", "p1", "g1@N01"), at(1, 8)).await?;
    ledger.submit(request("u1@N00", "p2", "g2@N01"), at(1, 9)).await?;
    ledger.submit(request("u1@N00", "p3", "g9@N01"), at(1, 10)).await?;

    let options = RunOptions {
        clock: clock_at(noon(1)),
        ..RunOptions::default()
    };
    let stats = execute(ledger.clone(), flickr.clone(), options).await?;
    assert_eq!(stats.permanent_success, 1);
    assert_eq!(stats.deferred, 1);
    assert_eq!(stats.permanent_fail, 1);
    assert_eq!(flickr.add_calls(), 2);

    let remaining = ledger.eligible_requests(date(2), None).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].picture_id.as_str(), "p2");
    Ok(())
}

#[sqlx::test(migrator = "fga_core::MIGRATOR")]
async fn abandoned_attempts_close_as_transient(pool: PgPool) -> Result<()> {
    let ledger = PostgresLedger::from_pool(pool).await?;
    let req = ledger
        .submit(request("u1@N00", "p1", "g1@N01"), at(1, 1))
        .await?
        .request;
    ledger.open_attempt(req.id, at(1, 2)).await?;

    let status = AttemptStatus::failed(ABANDONED_DETAIL);
    assert_eq!(ledger.close_abandoned(at(1, 1), noon(1), &status).await?, 0);
    assert_eq!(ledger.close_abandoned(at(1, 3), noon(1), &status).await?, 1);

    let history = ledger.attempts_for(req.id).await?;
    assert_eq!(history[0].completed_at, Some(noon(1)));
    assert_eq!(history[0].final_status, Some(status));
    assert_eq!(ledger.eligible_requests(date(2), None).await?.len(), 1);
    Ok(())
}

#[sqlx::test(migrator = "fga_core::MIGRATOR")]
async fn failure_detail_survives_storage_verbatim(pool: PgPool) -> Result<()> {
    let ledger = PostgresLedger::from_pool(pool).await?;
    let req = ledger
        .submit(request("u1@N00", "p1", "g1@N01"), noon(1))
        .await?
        .request;

    let message = format!(
        "flickr 1: Groupe introuvable (référence 42) {}",
        "x".repeat(300)
    );
    let status = AttemptStatus::failed(&message);
    let attempt = ledger.open_attempt(req.id, noon(1)).await?;
    ledger.close_attempt(attempt.id, noon(1), &status).await?;

    let history = ledger.attempts_for(req.id).await?;
    let stored = history[0].final_status.as_ref().map(|s| s.code().into_owned());
    assert_eq!(stored, Some(format!("fail_{message}")));
    Ok(())
}
