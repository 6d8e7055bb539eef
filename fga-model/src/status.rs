//! Closed taxonomy of attempt outcomes.
//!
//! The stored representation is a short string code. Permanent codes share
//! the [`PERMANENT_PREFIX`] so the ledger can filter terminal requests
//! without decoding every row.

use std::borrow::Cow;
use std::fmt;

use crate::error::ModelError;

/// Prefix shared by every permanent status code.
pub const PERMANENT_PREFIX: &str = "permstatus_";

/// Prefix of generic non-permanent failures; the remainder is the detail.
pub const FAILURE_PREFIX: &str = "fail_";

/// Final status of a closed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttemptStatus {
    /// Remote add succeeded; the photo is now in the group pool.
    Added,
    /// Remote service accepted the photo into the moderation queue.
    AddedQueued,
    /// The photo was already in the target group.
    AlreadyInGroup,
    /// The requesting user is not a member of the target group.
    UserNotInGroup,
    /// The group's daily add quota is exhausted for this user.
    GroupThrottled,
    /// Any other remote or transport failure, with its diagnostic text.
    Failed(FailureDetail),
}

/// Coarse outcome bucket used for run statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatusClass {
    PermanentSuccess,
    PermanentFailure,
    Deferred,
    TransientFailure,
}

impl AttemptStatus {
    /// Build a generic failure from free-form diagnostic text.
    pub fn failed(detail: impl AsRef<str>) -> Self {
        AttemptStatus::Failed(FailureDetail::new(detail))
    }

    pub fn code(&self) -> Cow<'static, str> {
        match self {
            AttemptStatus::Added => Cow::Borrowed("permstatus_success_added"),
            AttemptStatus::AddedQueued => {
                Cow::Borrowed("permstatus_success_added_queued")
            }
            AttemptStatus::AlreadyInGroup => {
                Cow::Borrowed("permstatus_success_pic_already_in_group")
            }
            AttemptStatus::UserNotInGroup => {
                Cow::Borrowed("permstatus_fail_user_not_in_flickr_group")
            }
            AttemptStatus::GroupThrottled => {
                Cow::Borrowed("defer_group_throttled_for_user")
            }
            AttemptStatus::Failed(detail) => {
                Cow::Owned(format!("{FAILURE_PREFIX}{}", detail.as_str()))
            }
        }
    }

    /// Decode a status code previously produced by [`AttemptStatus::code`].
    pub fn parse(code: &str) -> Result<Self, ModelError> {
        match code {
            "permstatus_success_added" => Ok(AttemptStatus::Added),
            "permstatus_success_added_queued" => Ok(AttemptStatus::AddedQueued),
            "permstatus_success_pic_already_in_group" => {
                Ok(AttemptStatus::AlreadyInGroup)
            }
            "permstatus_fail_user_not_in_flickr_group" => {
                Ok(AttemptStatus::UserNotInGroup)
            }
            "defer_group_throttled_for_user" => {
                Ok(AttemptStatus::GroupThrottled)
            }
            other => match other.strip_prefix(FAILURE_PREFIX) {
                Some(detail) if !detail.is_empty() => {
                    Ok(AttemptStatus::Failed(FailureDetail::new(detail)))
                }
                _ => Err(ModelError::UnknownStatus(other.to_owned())),
            },
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            AttemptStatus::Added
            | AttemptStatus::AddedQueued
            | AttemptStatus::AlreadyInGroup => StatusClass::PermanentSuccess,
            AttemptStatus::UserNotInGroup => StatusClass::PermanentFailure,
            AttemptStatus::GroupThrottled => StatusClass::Deferred,
            AttemptStatus::Failed(_) => StatusClass::TransientFailure,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(
            self.class(),
            StatusClass::PermanentSuccess | StatusClass::PermanentFailure
        )
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl StatusClass {
    pub fn is_permanent(self) -> bool {
        matches!(
            self,
            StatusClass::PermanentSuccess | StatusClass::PermanentFailure
        )
    }
}

/// Diagnostic text carried by generic failures, stored verbatim apart from
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FailureDetail(String);

impl FailureDetail {
    pub fn new(raw: impl AsRef<str>) -> Self {
        match raw.as_ref().trim() {
            "" => FailureDetail("unknown".to_owned()),
            detail => FailureDetail(detail.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
