use chrono::{DateTime, Utc};

use crate::ids::{GroupId, PictureId, RequestId, UserId};

/// Immutable record of a user's intent to add a picture to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubmittedRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub picture_id: PictureId,
    pub group_id: GroupId,
    /// Only used to order work first-come-first-served.
    pub submitted_at: DateTime<Utc>,
}

/// Input for creating a [`SubmittedRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewRequest {
    pub user_id: UserId,
    pub picture_id: PictureId,
    pub group_id: GroupId,
}

impl NewRequest {
    pub fn new(user_id: UserId, picture_id: PictureId, group_id: GroupId) -> Self {
        Self {
            user_id,
            picture_id,
            group_id,
        }
    }

    pub fn into_submitted(self, submitted_at: DateTime<Utc>) -> SubmittedRequest {
        SubmittedRequest {
            id: RequestId::new(),
            user_id: self.user_id,
            picture_id: self.picture_id,
            group_id: self.group_id,
            submitted_at,
        }
    }
}

/// Result of a submission: either a fresh request or the existing one for the
/// same (user, picture, group) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub request: SubmittedRequest,
    pub created: bool,
}
