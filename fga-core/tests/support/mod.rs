//! Shared fakes for core integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fga_core::flickr::{ErrorCategory, FlickrApi, FlickrError};
use fga_core::ledger::AttemptLedger;
use fga_core::processor::Clock;
use fga_core::{LedgerError, Result};
use fga_model::{
    AddAttempt, AttemptId, AttemptStatus, BacklogSummary, GroupId, NewRequest,
    PictureId, RequestId, SubmitOutcome, SubmittedRequest, UserId,
};

pub fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

pub fn picture(id: &str) -> PictureId {
    PictureId::parse(id).unwrap()
}

pub fn group(id: &str) -> GroupId {
    GroupId::parse(id).unwrap()
}

pub fn request(u: &str, p: &str, g: &str) -> NewRequest {
    NewRequest::new(user(u), picture(p), group(g))
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// Noon UTC on the given day of March 2024.
pub fn noon(day: u32) -> DateTime<Utc> {
    at(day, 12)
}

pub fn date(day: u32) -> NaiveDate {
    noon(day).date_naive()
}

pub fn clock_at(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}

/// Scripted Flickr facade with per-operation call counters.
#[derive(Default)]
pub struct FakeFlickr {
    user_groups: HashMap<UserId, HashSet<GroupId>>,
    picture_groups: HashMap<PictureId, HashSet<GroupId>>,
    add_errors: Mutex<HashMap<(PictureId, GroupId), FlickrError>>,
    pub user_lookups: AtomicUsize,
    pub picture_lookups: AtomicUsize,
    pub adds: AtomicUsize,
    pub added: Mutex<Vec<(UserId, PictureId, GroupId)>>,
}

impl FakeFlickr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, u: &str, groups: &[&str]) -> Self {
        self.user_groups
            .entry(user(u))
            .or_default()
            .extend(groups.iter().map(|g| group(g)));
        self
    }

    pub fn with_picture_in(mut self, p: &str, groups: &[&str]) -> Self {
        self.picture_groups
            .entry(picture(p))
            .or_default()
            .extend(groups.iter().map(|g| group(g)));
        self
    }

    /// Make every add of `p` to `g` fail with the given Flickr error code.
    pub fn failing_add(self, p: &str, g: &str, code: u32, message: &str) -> Self {
        self.add_errors.lock().unwrap().insert(
            (picture(p), group(g)),
            FlickrError::Api {
                category: ErrorCategory::for_pool_add(code),
                code,
                message: message.to_owned(),
            },
        );
        self
    }

    pub fn clear_add_failure(&self, p: &str, g: &str) {
        self.add_errors.lock().unwrap().remove(&(picture(p), group(g)));
    }

    pub fn add_calls(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn user_lookup_calls(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }

    pub fn picture_lookup_calls(&self) -> usize {
        self.picture_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlickrApi for FakeFlickr {
    async fn add_photo_to_group(
        &self,
        owner: &UserId,
        picture: &PictureId,
        group: &GroupId,
    ) -> std::result::Result<(), FlickrError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .add_errors
            .lock()
            .unwrap()
            .get(&(picture.clone(), group.clone()))
        {
            return Err(err.clone());
        }
        self.added
            .lock()
            .unwrap()
            .push((owner.clone(), picture.clone(), group.clone()));
        Ok(())
    }

    async fn list_groups_for_user(
        &self,
        user: &UserId,
    ) -> std::result::Result<HashSet<GroupId>, FlickrError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent first lookups overlap.
        tokio::task::yield_now().await;
        Ok(self.user_groups.get(user).cloned().unwrap_or_default())
    }

    async fn list_groups_for_picture(
        &self,
        _owner: &UserId,
        picture: &PictureId,
    ) -> std::result::Result<HashSet<GroupId>, FlickrError> {
        self.picture_lookups.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.picture_groups.get(picture).cloned().unwrap_or_default())
    }
}

/// Ledger wrapper whose `close_attempt` starts failing after a number of
/// successful closes.
pub struct FlakyLedger<L> {
    inner: L,
    closes_before_failure: usize,
    closes: AtomicUsize,
    broken: AtomicBool,
}

impl<L> FlakyLedger<L> {
    pub fn new(inner: L, closes_before_failure: usize) -> Self {
        Self {
            inner,
            closes_before_failure,
            closes: AtomicUsize::new(0),
            broken: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: AttemptLedger> AttemptLedger for FlakyLedger<L> {
    async fn submit(
        &self,
        request: NewRequest,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        self.inner.submit(request, submitted_at).await
    }

    async fn eligible_requests(
        &self,
        today: NaiveDate,
        limit: Option<usize>,
    ) -> Result<Vec<SubmittedRequest>> {
        self.inner.eligible_requests(today, limit).await
    }

    async fn open_attempt(
        &self,
        request_id: RequestId,
        started_at: DateTime<Utc>,
    ) -> Result<AddAttempt> {
        self.inner.open_attempt(request_id, started_at).await
    }

    async fn close_attempt(
        &self,
        attempt_id: AttemptId,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<AddAttempt> {
        if self.broken.load(Ordering::SeqCst)
            || self.closes.fetch_add(1, Ordering::SeqCst)
                >= self.closes_before_failure
        {
            self.broken.store(true, Ordering::SeqCst);
            return Err(LedgerError::Unavailable("connection reset".into()));
        }
        self.inner.close_attempt(attempt_id, completed_at, status).await
    }

    async fn attempts_for(&self, request_id: RequestId) -> Result<Vec<AddAttempt>> {
        self.inner.attempts_for(request_id).await
    }

    async fn close_abandoned(
        &self,
        started_before: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<u64> {
        self.inner
            .close_abandoned(started_before, completed_at, status)
            .await
    }

    async fn backlog_summary(&self, today: NaiveDate) -> Result<BacklogSummary> {
        self.inner.backlog_summary(today).await
    }
}
