//! Per-request state machine.
//!
//! `Selected -> AttemptOpened -> {PreCheckShortCircuit | RemoteCallIssued}
//! -> Classified -> AttemptClosed`. The attempt row is written before any
//! remote call so a crash leaves an auditable open attempt behind.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fga_model::{AttemptStatus, SubmittedRequest};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, MembershipCache};
use crate::classifier::{
    check_picture_membership, check_user_membership, classify_add_result,
    classify_error,
};
use crate::flickr::FlickrApi;
use crate::ledger::AttemptLedger;
use crate::{LedgerError, Result};

/// Source of attempt timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Result of handling one selected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// An attempt was opened and closed with this status.
    Closed(AttemptStatus),
    /// The ledger refused a new attempt (open or permanent attempt already
    /// recorded); nothing was written.
    Skipped,
}

pub struct RequestProcessor {
    ledger: Arc<dyn AttemptLedger>,
    flickr: Arc<dyn FlickrApi>,
    cache: MembershipCache,
    clock: Clock,
}

impl fmt::Debug for RequestProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestProcessor")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl RequestProcessor {
    /// One processor (and therefore one membership cache) per run.
    pub fn new(
        ledger: Arc<dyn AttemptLedger>,
        flickr: Arc<dyn FlickrApi>,
    ) -> Self {
        let cache = MembershipCache::new(Arc::clone(&flickr));
        Self {
            ledger,
            flickr,
            cache,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drive one request through a full attempt.
    ///
    /// Remote failures never escape: they are classified and recorded. Only
    /// ledger failures are returned, and every one except a per-request
    /// conflict is fatal to the run.
    pub async fn process_one(
        &self,
        request: &SubmittedRequest,
    ) -> Result<ProcessOutcome> {
        let attempt = match self
            .ledger
            .open_attempt(request.id, (self.clock)())
            .await
        {
            Ok(attempt) => attempt,
            Err(LedgerError::Conflict { reason, .. }) => {
                warn!(
                    request_id = %request.id,
                    %reason,
                    "skipping request; ledger refused a new attempt"
                );
                return Ok(ProcessOutcome::Skipped);
            }
            Err(err) => return Err(err),
        };
        debug!(request_id = %request.id, attempt_id = %attempt.id, "attempt opened");

        let status = self.determine_status(request).await;

        self.ledger
            .close_attempt(attempt.id, (self.clock)(), &status)
            .await?;

        info!(
            request_id = %request.id,
            attempt_id = %attempt.id,
            user = %request.user_id,
            picture = %request.picture_id,
            group = %request.group_id,
            status = %status,
            "attempt closed"
        );
        Ok(ProcessOutcome::Closed(status))
    }

    async fn determine_status(&self, request: &SubmittedRequest) -> AttemptStatus {
        let user_groups = match self.cache.groups_for_user(&request.user_id).await
        {
            Ok(groups) => groups,
            Err(err) => return classify_error(&err),
        };
        if let Some(status) = check_user_membership(&user_groups, &request.group_id)
        {
            return status;
        }

        let picture_groups = match self
            .cache
            .groups_for_picture(&request.user_id, &request.picture_id)
            .await
        {
            Ok(groups) => groups,
            Err(err) => return classify_error(&err),
        };
        if let Some(status) =
            check_picture_membership(&picture_groups, &request.group_id)
        {
            return status;
        }

        let result = self
            .flickr
            .add_photo_to_group(
                &request.user_id,
                &request.picture_id,
                &request.group_id,
            )
            .await;
        classify_add_result(&result)
    }
}
