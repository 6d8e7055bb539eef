//! Facade over the Flickr group-pool API.
//!
//! The processor only depends on [`FlickrApi`]; [`FlickrRestClient`] is the
//! production implementation.

pub mod credentials;
pub mod oauth;
pub mod rest;

use std::collections::HashSet;

use async_trait::async_trait;
use fga_model::{GroupId, PictureId, UserId};

pub use credentials::{AppCredentials, UserCredentials};
pub use rest::{FlickrRestClient, GroupSummary};

/// Structured error category of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The group's daily add quota for this user is exhausted.
    Throttled,
    /// The photo went into (or already sits in) the moderation queue.
    QueuedForModeration,
    /// The photo is already in the group pool.
    AlreadyInPool,
    Other,
}

impl ErrorCategory {
    /// Map a `flickr.groups.pools.add` error code to its category.
    pub fn for_pool_add(code: u32) -> Self {
        match code {
            3 => ErrorCategory::AlreadyInPool,
            5 => ErrorCategory::Throttled,
            6 | 7 => ErrorCategory::QueuedForModeration,
            _ => ErrorCategory::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlickrError {
    /// Well-formed failure response from the API.
    #[error("flickr error {code}: {message}")]
    Api {
        category: ErrorCategory,
        code: u32,
        message: String,
    },

    #[error("no credentials loaded for user {0}")]
    MissingCredentials(UserId),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl FlickrError {
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            FlickrError::Api { category, .. } => Some(*category),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FlickrError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_decode() {
            "decode"
        } else if err.is_status() {
            "status"
        } else {
            "request"
        };
        // Drop the URL: it carries signed query parameters.
        FlickrError::Transport(format!("{kind}: {}", err.without_url()))
    }
}

/// Remote operations consumed by the request processor.
///
/// `owner` selects whose credentials sign the call; every request is executed
/// on behalf of the user who submitted it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlickrApi: Send + Sync {
    async fn add_photo_to_group(
        &self,
        owner: &UserId,
        picture: &PictureId,
        group: &GroupId,
    ) -> Result<(), FlickrError>;

    async fn list_groups_for_user(
        &self,
        user: &UserId,
    ) -> Result<HashSet<GroupId>, FlickrError>;

    async fn list_groups_for_picture(
        &self,
        owner: &UserId,
        picture: &PictureId,
    ) -> Result<HashSet<GroupId>, FlickrError>;
}
