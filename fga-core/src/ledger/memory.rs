use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fga_model::{
    AddAttempt, AttemptId, AttemptStatus, BacklogSummary, NewRequest,
    RequestId, SubmitOutcome, SubmittedRequest,
};
use tokio::sync::Mutex;

use super::AttemptLedger;
use crate::selector::{RequestEligibility, evaluate};
use crate::{LedgerError, Result};

/// In-process ledger with the same semantics as the Postgres one.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<SubmittedRequest>,
    attempts: Vec<AddAttempt>,
}

impl State {
    fn history(&self, request_id: RequestId) -> Vec<AddAttempt> {
        let mut history: Vec<AddAttempt> = self
            .attempts
            .iter()
            .filter(|a| a.request_id == request_id)
            .cloned()
            .collect();
        history.sort_by_key(|a| (a.started_at, a.id));
        history
    }

    fn histories(&self) -> HashMap<RequestId, Vec<AddAttempt>> {
        let mut by_request: HashMap<RequestId, Vec<AddAttempt>> = HashMap::new();
        for attempt in &self.attempts {
            by_request
                .entry(attempt.request_id)
                .or_default()
                .push(attempt.clone());
        }
        by_request
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptLedger for MemoryLedger {
    async fn submit(
        &self,
        request: NewRequest,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        let mut state = self.inner.lock().await;
        if let Some(existing) = state.requests.iter().find(|r| {
            r.user_id == request.user_id
                && r.picture_id == request.picture_id
                && r.group_id == request.group_id
        }) {
            return Ok(SubmitOutcome {
                request: existing.clone(),
                created: false,
            });
        }

        let stored = request.into_submitted(submitted_at);
        state.requests.push(stored.clone());
        Ok(SubmitOutcome {
            request: stored,
            created: true,
        })
    }

    async fn eligible_requests(
        &self,
        today: NaiveDate,
        limit: Option<usize>,
    ) -> Result<Vec<SubmittedRequest>> {
        let state = self.inner.lock().await;
        let histories = state.histories();

        let mut eligible: Vec<SubmittedRequest> = state
            .requests
            .iter()
            .filter(|r| {
                let history = histories.get(&r.id).map(Vec::as_slice).unwrap_or(&[]);
                evaluate(history, today).is_eligible()
            })
            .cloned()
            .collect();
        eligible.sort_by_key(|r| (r.submitted_at, r.id));
        if let Some(limit) = limit {
            eligible.truncate(limit);
        }
        Ok(eligible)
    }

    async fn open_attempt(
        &self,
        request_id: RequestId,
        started_at: DateTime<Utc>,
    ) -> Result<AddAttempt> {
        let mut state = self.inner.lock().await;
        if !state.requests.iter().any(|r| r.id == request_id) {
            return Err(LedgerError::RequestNotFound(request_id));
        }

        let history = state.history(request_id);
        if history.iter().any(AddAttempt::is_open) {
            return Err(LedgerError::Conflict {
                request_id,
                reason: "an attempt is already open".into(),
            });
        }
        if history.iter().any(AddAttempt::is_permanent) {
            return Err(LedgerError::Conflict {
                request_id,
                reason: "a permanent outcome is already recorded".into(),
            });
        }

        let attempt = AddAttempt::open(request_id, started_at);
        state.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn close_attempt(
        &self,
        attempt_id: AttemptId,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<AddAttempt> {
        let mut state = self.inner.lock().await;
        let attempt = state
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.is_open())
            .ok_or(LedgerError::AttemptNotOpen(attempt_id))?;

        attempt.completed_at = Some(completed_at);
        attempt.final_status = Some(status.clone());
        Ok(attempt.clone())
    }

    async fn attempts_for(&self, request_id: RequestId) -> Result<Vec<AddAttempt>> {
        Ok(self.inner.lock().await.history(request_id))
    }

    async fn close_abandoned(
        &self,
        started_before: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<u64> {
        let mut state = self.inner.lock().await;
        let mut closed = 0;
        for attempt in state
            .attempts
            .iter_mut()
            .filter(|a| a.is_open() && a.started_at < started_before)
        {
            attempt.completed_at = Some(completed_at);
            attempt.final_status = Some(status.clone());
            closed += 1;
        }
        Ok(closed)
    }

    async fn backlog_summary(&self, today: NaiveDate) -> Result<BacklogSummary> {
        let state = self.inner.lock().await;
        let histories = state.histories();

        let mut summary = BacklogSummary {
            total: state.requests.len() as u64,
            ..BacklogSummary::default()
        };
        for request in &state.requests {
            let history = histories
                .get(&request.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            match evaluate(history, today) {
                RequestEligibility::Eligible => summary.eligible += 1,
                RequestEligibility::Terminal => summary.terminal += 1,
                RequestEligibility::InFlight => summary.in_flight += 1,
                RequestEligibility::AttemptedToday
                | RequestEligibility::NotYetDue => summary.attempted_today += 1,
            }
        }
        Ok(summary)
    }
}
