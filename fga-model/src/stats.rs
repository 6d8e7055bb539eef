use std::fmt;

use crate::status::StatusClass;

/// Counters reported at the end of a processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    pub permanent_success: u64,
    pub permanent_fail: u64,
    pub deferred: u64,
    pub transient_fail: u64,
    /// Non-terminal requests left out of this run (attempted today or in
    /// flight).
    pub skipped: u64,
    /// Open attempts closed by abandoned-attempt reconciliation.
    pub abandoned_closed: u64,
}

impl RunStats {
    pub fn record(&mut self, class: StatusClass) {
        match class {
            StatusClass::PermanentSuccess => self.permanent_success += 1,
            StatusClass::PermanentFailure => self.permanent_fail += 1,
            StatusClass::Deferred => self.deferred += 1,
            StatusClass::TransientFailure => self.transient_fail += 1,
        }
    }

    /// Number of attempts closed by the processor during the run.
    pub fn processed(&self) -> u64 {
        self.permanent_success
            + self.permanent_fail
            + self.deferred
            + self.transient_fail
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} permanent_success={} permanent_fail={} deferred={} \
             transient_fail={} skipped={} abandoned_closed={}",
            self.processed(),
            self.permanent_success,
            self.permanent_fail,
            self.deferred,
            self.transient_fail,
            self.skipped,
            self.abandoned_closed
        )
    }
}

/// Snapshot of the request backlog relative to one UTC day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BacklogSummary {
    pub total: u64,
    /// Requests whose latest attempt carries a permanent status.
    pub terminal: u64,
    /// Requests the eligibility selector would return for the day.
    pub eligible: u64,
    /// Non-terminal requests whose latest attempt started on the day.
    pub attempted_today: u64,
    /// Requests whose latest attempt is still open.
    pub in_flight: u64,
}

impl BacklogSummary {
    pub fn skipped(&self) -> u64 {
        self.attempted_today + self.in_flight
    }
}
