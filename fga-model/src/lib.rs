//! Core data model definitions shared across fga crates.
#![allow(missing_docs)]

pub mod attempt;
pub mod error;
pub mod ids;
pub mod request;
pub mod stats;
pub mod status;

pub use attempt::AddAttempt;
pub use error::{ModelError, Result as ModelResult};
pub use ids::{AttemptId, GroupId, PictureId, RequestId, UserId};
pub use request::{NewRequest, SubmitOutcome, SubmittedRequest};
pub use stats::{BacklogSummary, RunStats};
pub use status::{
    AttemptStatus, FAILURE_PREFIX, FailureDetail, PERMANENT_PREFIX,
    StatusClass,
};
