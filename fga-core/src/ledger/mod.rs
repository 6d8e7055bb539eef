//! Persistence contracts for submitted requests and their attempt history.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fga_model::{
    AddAttempt, AttemptId, AttemptStatus, BacklogSummary, NewRequest,
    RequestId, SubmitOutcome, SubmittedRequest,
};

use crate::Result;

pub use memory::MemoryLedger;
#[cfg(feature = "postgres")]
pub use postgres::PostgresLedger;

/// Durable store of submitted requests and their append-only attempts.
///
/// Attempts are only ever inserted open and closed once. Implementations must
/// reject opening an attempt for a request that already has an open or
/// permanent one with [`LedgerError::Conflict`](crate::LedgerError::Conflict).
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    /// Record a request. Re-submitting an existing (user, picture, group)
    /// triple returns the stored request with `created = false`.
    async fn submit(
        &self,
        request: NewRequest,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmitOutcome>;

    /// Requests eligible on `today`, oldest submission first.
    async fn eligible_requests(
        &self,
        today: NaiveDate,
        limit: Option<usize>,
    ) -> Result<Vec<SubmittedRequest>>;

    async fn open_attempt(
        &self,
        request_id: RequestId,
        started_at: DateTime<Utc>,
    ) -> Result<AddAttempt>;

    async fn close_attempt(
        &self,
        attempt_id: AttemptId,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<AddAttempt>;

    /// Full history for one request, ordered by start time.
    async fn attempts_for(&self, request_id: RequestId) -> Result<Vec<AddAttempt>>;

    /// Close every attempt opened before `started_before` with `status`.
    /// Returns the number of attempts closed.
    async fn close_abandoned(
        &self,
        started_before: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<u64>;

    async fn backlog_summary(&self, today: NaiveDate) -> Result<BacklogSummary>;
}
