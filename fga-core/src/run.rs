//! One processing run: reconcile, select, process, report.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fga_model::{AttemptStatus, RunStats};
use futures::StreamExt;
use futures::stream;
use tracing::{error, info, warn};

use crate::flickr::FlickrApi;
use crate::ledger::AttemptLedger;
use crate::processor::{Clock, ProcessOutcome, RequestProcessor, system_clock};
use crate::selector::select_batch;
use crate::{LedgerError, RunError};

pub const DEFAULT_ABANDONED_ATTEMPT_AFTER: Duration = Duration::from_secs(6 * 60 * 60);

/// Detail recorded on attempts closed by reconciliation.
pub const ABANDONED_DETAIL: &str = "abandoned_attempt";

#[derive(Clone)]
pub struct RunOptions {
    /// 1 keeps processing strictly sequential.
    pub max_concurrent_requests: usize,
    pub max_requests_per_run: Option<usize>,
    pub abandoned_attempt_after: Duration,
    pub clock: Clock,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 1,
            max_requests_per_run: None,
            abandoned_attempt_after: DEFAULT_ABANDONED_ATTEMPT_AFTER,
            clock: system_clock(),
        }
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("max_requests_per_run", &self.max_requests_per_run)
            .field("abandoned_attempt_after", &self.abandoned_attempt_after)
            .finish_non_exhaustive()
    }
}

/// Close attempts left open for longer than `window` before `now`.
pub async fn reconcile_abandoned(
    ledger: &dyn AttemptLedger,
    now: DateTime<Utc>,
    window: Duration,
) -> crate::Result<u64> {
    let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let status = AttemptStatus::failed(ABANDONED_DETAIL);

    let closed = ledger.close_abandoned(cutoff, now, &status).await?;
    if closed > 0 {
        warn!(closed, %cutoff, "closed abandoned open attempts");
    }
    Ok(closed)
}

/// Execute one run with injected collaborators.
///
/// Returns the run statistics, or [`RunError::Ledger`] carrying the partial
/// statistics when a ledger write fails. After a fatal failure no further
/// requests are dispatched; requests already in flight finish normally.
pub async fn execute(
    ledger: Arc<dyn AttemptLedger>,
    flickr: Arc<dyn FlickrApi>,
    options: RunOptions,
) -> Result<RunStats, RunError> {
    let mut stats = RunStats::default();
    let fail = |stats: RunStats, source: LedgerError| {
        error!(error = %source, %stats, "run aborted by ledger failure");
        RunError::Ledger { stats, source }
    };

    let now = (options.clock)();
    let today = now.date_naive();
    info!(%today, "starting group-add run");

    stats.abandoned_closed = reconcile_abandoned(
        ledger.as_ref(),
        now,
        options.abandoned_attempt_after,
    )
    .await
    .map_err(|e| fail(stats, e))?;

    let backlog = ledger
        .backlog_summary(today)
        .await
        .map_err(|e| fail(stats, e))?;
    stats.skipped = backlog.skipped();

    let batch = select_batch(ledger.as_ref(), today, options.max_requests_per_run)
        .await
        .map_err(|e| fail(stats, e))?;

    let processor = RequestProcessor::new(Arc::clone(&ledger), flickr)
        .with_clock(Arc::clone(&options.clock));
    let halted = AtomicBool::new(false);
    let mut fatal: Option<LedgerError> = None;

    let mut results = stream::iter(batch.iter())
        .map(|request| {
            let processor = &processor;
            let halted = &halted;
            async move {
                if halted.load(Ordering::Acquire) {
                    return None;
                }
                Some(processor.process_one(request).await)
            }
        })
        .buffered(options.max_concurrent_requests.max(1));

    while let Some(result) = results.next().await {
        match result {
            Some(Ok(ProcessOutcome::Closed(status))) => stats.record(status.class()),
            Some(Ok(ProcessOutcome::Skipped)) => stats.skipped += 1,
            Some(Err(err)) => {
                halted.store(true, Ordering::Release);
                if fatal.is_none() {
                    fatal = Some(err);
                } else {
                    warn!(error = %err, "additional ledger failure after abort");
                }
            }
            None => {}
        }
    }
    drop(results);

    let cache = processor.cache_stats();
    info!(
        %stats,
        selected = batch.len(),
        cache_lookups = cache.lookups,
        cache_fetches = cache.fetches,
        "group-add run finished"
    );

    match fatal {
        Some(source) => Err(fail(stats, source)),
        None => Ok(stats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use chrono::TimeZone;
    use fga_model::{GroupId, NewRequest, PictureId, UserId};

    #[tokio::test]
    async fn reconcile_closes_only_attempts_older_than_window() {
        let ledger = MemoryLedger::new();
        let t = |h| Utc.with_ymd_and_hms(2024, 7, 1, h, 0, 0).unwrap();
        for pic in ["1", "2"] {
            ledger
                .submit(
                    NewRequest::new(
                        UserId::parse("u@N00").unwrap(),
                        PictureId::parse(pic).unwrap(),
                        GroupId::parse("g@N01").unwrap(),
                    ),
                    t(0),
                )
                .await
                .unwrap();
        }
        let requests = ledger.eligible_requests(t(0).date_naive(), None).await.unwrap();
        ledger.open_attempt(requests[0].id, t(1)).await.unwrap();
        ledger.open_attempt(requests[1].id, t(10)).await.unwrap();

        let closed = reconcile_abandoned(&ledger, t(12), Duration::from_secs(6 * 3600))
            .await
            .unwrap();
        assert_eq!(closed, 1);

        let history = ledger.attempts_for(requests[0].id).await.unwrap();
        assert_eq!(
            history[0].final_status.as_ref().map(|s| s.code().into_owned()),
            Some("fail_abandoned_attempt".to_owned())
        );
    }
}
