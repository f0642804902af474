use async_trait::async_trait;
use moka::sync::Cache;
use std::time::Duration;

use super::EntityStore;
use super::error::StoreError;
use crate::entity::{Posting, Profile};

/// Read-through cache over an [`EntityStore`].
///
/// Profiles and postings are cached by id with LRU eviction and a time-to-live; lookup-key
/// resolution and stale-item listing always go to the inner store.
pub struct CachedEntityStore<S> {
    inner: S,
    profiles: Cache<String, Profile>,
    postings: Cache<String, Posting>,
}

impl<S: EntityStore> CachedEntityStore<S> {
    const DEFAULT_CAPACITY: u64 = 10_000;
    const DEFAULT_TTL: Duration = Duration::from_secs(60);

    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY, Self::DEFAULT_TTL)
    }

    pub fn with_capacity(inner: S, capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            profiles: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            postings: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drops any cached profile or posting with this id.
    pub fn invalidate(&self, id: &str) {
        self.profiles.invalidate(id);
        self.postings.invalidate(id);
    }

    pub fn clear(&self) {
        self.profiles.invalidate_all();
        self.postings.invalidate_all();
    }
}

#[async_trait]
impl<S: EntityStore> EntityStore for CachedEntityStore<S> {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        if let Some(profile) = self.profiles.get(id) {
            return Ok(Some(profile));
        }
        let profile = self.inner.profile(id).await?;
        if let Some(profile) = &profile {
            self.profiles.insert(id.to_string(), profile.clone());
        }
        Ok(profile)
    }

    async fn profile_id_by_lookup_key(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.profile_id_by_lookup_key(key).await
    }

    async fn postings(&self, ids: &[String]) -> Result<Vec<Posting>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        let mut misses = Vec::new();
        for id in ids {
            match self.postings.get(id) {
                Some(posting) => out.push(posting),
                None => misses.push(id.clone()),
            }
        }

        if !misses.is_empty() {
            for posting in self.inner.postings(&misses).await? {
                self.postings.insert(posting.id.clone(), posting.clone());
                out.push(posting);
            }
        }

        Ok(out)
    }

    async fn stale_postings(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        self.inner.stale_postings(limit).await
    }
}
