use fga_model::{AttemptId, RequestId, RunStats};
use thiserror::Error;

/// Failures raised by an [`AttemptLedger`](crate::ledger::AttemptLedger).
#[derive(Error, Debug)]
pub enum LedgerError {
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "postgres")]
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("request {0} not found")]
    RequestNotFound(RequestId),

    /// The request already has an open or permanent attempt.
    #[error("request {request_id} cannot take a new attempt: {reason}")]
    Conflict {
        request_id: RequestId,
        reason: String,
    },

    #[error("attempt {0} is not open")]
    AttemptNotOpen(AttemptId),

    #[error("corrupt ledger row: {0}")]
    Corrupt(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Conflicts are per-request and never abort a run.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

/// Fatal run failure. Carries the statistics gathered before the abort so
/// the caller can still report them.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("ledger failure aborted the run ({stats})")]
    Ledger {
        stats: RunStats,
        #[source]
        source: LedgerError,
    },
}

impl RunError {
    pub fn stats(&self) -> &RunStats {
        match self {
            RunError::Ledger { stats, .. } => stats,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
