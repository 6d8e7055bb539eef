//! Run-scoped membership cache.
//!
//! Entries are fetched from the facade on first reference and kept for the
//! rest of the run; there is no invalidation. Population is single-flight per
//! key so concurrent first lookups share one remote call. Failed fetches are
//! not memoised and will be retried by the next lookup.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use fga_model::{GroupId, PictureId, UserId};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::flickr::{FlickrApi, FlickrError};

pub type GroupSet = Arc<HashSet<GroupId>>;

type Slot = Arc<OnceCell<GroupSet>>;

/// Lookup counters for the end-of-run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: u64,
    pub fetches: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.lookups.saturating_sub(self.fetches)
    }
}

pub struct MembershipCache {
    flickr: Arc<dyn FlickrApi>,
    users: DashMap<UserId, Slot>,
    pictures: DashMap<PictureId, Slot>,
    lookups: AtomicU64,
    fetches: AtomicU64,
}

impl fmt::Debug for MembershipCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipCache")
            .field("users", &self.users.len())
            .field("pictures", &self.pictures.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl MembershipCache {
    pub fn new(flickr: Arc<dyn FlickrApi>) -> Self {
        Self {
            flickr,
            users: DashMap::new(),
            pictures: DashMap::new(),
            lookups: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Groups the user belongs to.
    pub async fn groups_for_user(
        &self,
        user: &UserId,
    ) -> Result<GroupSet, FlickrError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        // Clone the slot out so no shard lock is held across the fetch.
        let slot = Arc::clone(self.users.entry(user.clone()).or_default().value());

        let groups = slot
            .get_or_try_init(|| async {
                self.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(user = %user, "fetching user group memberships");
                self.flickr.list_groups_for_user(user).await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(groups))
    }

    /// Groups whose pool already contains the picture. `owner` only selects
    /// the credentials used for the fetch; the cache key is the picture.
    pub async fn groups_for_picture(
        &self,
        owner: &UserId,
        picture: &PictureId,
    ) -> Result<GroupSet, FlickrError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let slot =
            Arc::clone(self.pictures.entry(picture.clone()).or_default().value());

        let groups = slot
            .get_or_try_init(|| async {
                self.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(picture = %picture, "fetching picture pool contexts");
                self.flickr
                    .list_groups_for_picture(owner, picture)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(groups))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }
}
