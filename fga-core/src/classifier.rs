//! Maps pre-check results and remote add outcomes onto [`AttemptStatus`].
//!
//! Classification only looks at structured error categories, never at the
//! human-readable message; the message is kept as diagnostic detail.

use std::collections::HashSet;

use fga_model::{AttemptStatus, GroupId};

use crate::flickr::{ErrorCategory, FlickrError};

/// Pre-check: the requesting user must belong to the target group.
pub fn check_user_membership(
    user_groups: &HashSet<GroupId>,
    group: &GroupId,
) -> Option<AttemptStatus> {
    (!user_groups.contains(group)).then_some(AttemptStatus::UserNotInGroup)
}

/// Pre-check: a picture already in the target group needs no remote add.
pub fn check_picture_membership(
    picture_groups: &HashSet<GroupId>,
    group: &GroupId,
) -> Option<AttemptStatus> {
    picture_groups
        .contains(group)
        .then_some(AttemptStatus::AlreadyInGroup)
}

/// Classify the result of the single remote add call.
pub fn classify_add_result(result: &Result<(), FlickrError>) -> AttemptStatus {
    match result {
        Ok(()) => AttemptStatus::Added,
        Err(err) => classify_error(err),
    }
}

/// Classify any facade error, including failures of the pre-check lookups.
pub fn classify_error(err: &FlickrError) -> AttemptStatus {
    match err {
        FlickrError::Api {
            category: ErrorCategory::Throttled,
            ..
        } => AttemptStatus::GroupThrottled,
        FlickrError::Api {
            category: ErrorCategory::QueuedForModeration,
            ..
        } => AttemptStatus::AddedQueued,
        FlickrError::Api {
            category: ErrorCategory::AlreadyInPool,
            ..
        } => AttemptStatus::AlreadyInGroup,
        FlickrError::Api {
            category: ErrorCategory::Other,
            code,
            message,
        } => AttemptStatus::failed(format!("flickr {code}: {message}")),
        FlickrError::MissingCredentials(_) => {
            AttemptStatus::failed("missing credentials")
        }
        FlickrError::Transport(detail) => {
            AttemptStatus::failed(format!("transport: {detail}"))
        }
        FlickrError::Decode(detail) => {
            AttemptStatus::failed(format!("bad response: {detail}"))
        }
    }
}
