use chrono::{DateTime, NaiveDate, Utc};

use crate::ids::{AttemptId, RequestId};
use crate::status::AttemptStatus;

/// One append-only row of the attempt ledger.
///
/// `completed_at` and `final_status` are set together when the attempt is
/// closed; an attempt with neither is open (in flight).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddAttempt {
    pub id: AttemptId,
    pub request_id: RequestId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_status: Option<AttemptStatus>,
}

impl AddAttempt {
    pub fn open(request_id: RequestId, started_at: DateTime<Utc>) -> Self {
        Self {
            id: AttemptId::new(),
            request_id,
            started_at,
            completed_at: None,
            final_status: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }

    pub fn is_permanent(&self) -> bool {
        self.final_status
            .as_ref()
            .is_some_and(AttemptStatus::is_permanent)
    }

    /// UTC calendar date the attempt started on.
    pub fn started_on(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}
