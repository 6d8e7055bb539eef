//! Daily eligibility rules.
//!
//! A request is eligible on day `D` when it has never been attempted, or when
//! its most recent attempt is closed, started before `D` and is not
//! permanent. Any permanent attempt makes the request terminal forever. The
//! Postgres ledger expresses the same rule in SQL; [`evaluate`] is the
//! in-process form used by [`MemoryLedger`](crate::ledger::MemoryLedger) and
//! the backlog summary.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fga_model::{AddAttempt, SubmittedRequest};
use tracing::info;

use crate::error::Result;
use crate::ledger::AttemptLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestEligibility {
    /// Selected for the run.
    Eligible,
    /// A permanent outcome was recorded; never selected again.
    Terminal,
    /// Latest attempt is still open.
    InFlight,
    /// Latest attempt started on the run's day.
    AttemptedToday,
    /// Latest attempt started after the run's day (clock skew or a backdated
    /// run). Treated like an attempt made today.
    NotYetDue,
}

impl RequestEligibility {
    pub fn is_eligible(self) -> bool {
        matches!(self, RequestEligibility::Eligible)
    }
}

/// Classify a request from its full attempt history.
pub fn evaluate(attempts: &[AddAttempt], today: NaiveDate) -> RequestEligibility {
    if attempts.iter().any(AddAttempt::is_permanent) {
        return RequestEligibility::Terminal;
    }

    let Some(latest) = latest_attempt(attempts) else {
        return RequestEligibility::Eligible;
    };

    if latest.is_open() {
        return RequestEligibility::InFlight;
    }

    match latest.started_on().cmp(&today) {
        std::cmp::Ordering::Less => RequestEligibility::Eligible,
        std::cmp::Ordering::Equal => RequestEligibility::AttemptedToday,
        std::cmp::Ordering::Greater => RequestEligibility::NotYetDue,
    }
}

/// Most recent attempt by start time, ties broken by id.
pub fn latest_attempt(attempts: &[AddAttempt]) -> Option<&AddAttempt> {
    attempts
        .iter()
        .max_by(|a, b| (a.started_at, a.id).cmp(&(b.started_at, b.id)))
}

/// Midnight UTC at the start of `day`.
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Load the ordered batch of eligible requests for `today`.
pub async fn select_batch(
    ledger: &dyn AttemptLedger,
    today: NaiveDate,
    limit: Option<usize>,
) -> Result<Vec<SubmittedRequest>> {
    let batch = ledger.eligible_requests(today, limit).await?;
    info!(
        %today,
        selected = batch.len(),
        limit = ?limit,
        "selected eligible requests"
    );
    Ok(batch)
}
