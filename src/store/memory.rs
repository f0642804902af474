use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::error::StoreError;
use super::types::{QueueEntry, QueueKind, QueueReason, ScoreSnapshot};
use super::{EntityStore, FreshnessQueue, SnapshotLog};
use crate::entity::{Posting, Profile};

/// Process-local store implementing every store trait.
///
/// The queue lives behind one mutex, so a claim selects and leases its entries in a single
/// critical section.
#[derive(Default)]
pub struct InMemoryStore {
    profiles: RwLock<BTreeMap<String, Profile>>,
    postings: RwLock<BTreeMap<String, Posting>>,
    snapshots: Mutex<Vec<ScoreSnapshot>>,
    queue: Mutex<Vec<QueueEntry>>,
    fail_reads: AtomicBool,
    fail_snapshots: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.profiles.write().insert(profile.id.clone(), profile);
    }

    pub fn insert_posting(&self, posting: Posting) {
        self.postings.write().insert(posting.id.clone(), posting);
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.insert_profile(profile);
        self
    }

    pub fn with_postings<I: IntoIterator<Item = Posting>>(self, postings: I) -> Self {
        for posting in postings {
            self.insert_posting(posting);
        }
        self
    }

    pub fn get_profile(&self, id: &str) -> Option<Profile> {
        self.profiles.read().get(id).cloned()
    }

    pub fn get_posting(&self, id: &str) -> Option<Posting> {
        self.postings.read().get(id).cloned()
    }

    pub fn snapshots(&self) -> Vec<ScoreSnapshot> {
        self.snapshots.lock().clone()
    }

    pub fn queue_entries(&self) -> Vec<QueueEntry> {
        self.queue.lock().clone()
    }

    pub fn pending_entries(&self, kind: QueueKind) -> Vec<QueueEntry> {
        self.queue
            .lock()
            .iter()
            .filter(|e| e.kind == kind && e.is_pending())
            .cloned()
            .collect()
    }

    /// Makes entity reads fail as if the store were unreachable.
    pub fn set_read_failure(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_snapshot_failure(&self, failing: bool) {
        self.fail_snapshots.store(failing, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "in-memory store reads disabled".to_string(),
            });
        }
        Ok(())
    }

    /// Claim with an explicit clock.
    pub fn claim_at(
        &self,
        kind: QueueKind,
        limit: usize,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Vec<QueueEntry> {
        let lease_end = TimeDelta::from_std(lease)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut queue = self.queue.lock();
        let mut candidates: Vec<usize> = queue
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == kind && e.is_claimable(now))
            .map(|(i, _)| i)
            .collect();
        candidates.sort_by_key(|&i| queue[i].enqueued_at);
        candidates.truncate(limit);

        candidates
            .into_iter()
            .map(|i| {
                queue[i].claimed_until = Some(lease_end);
                queue[i].clone()
            })
            .collect()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.check_reads()?;
        Ok(self.get_profile(id))
    }

    async fn profile_id_by_lookup_key(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_reads()?;
        let key = key.trim();
        Ok(self
            .profiles
            .read()
            .values()
            .find(|p| p.email.as_deref().is_some_and(|email| email.trim() == key))
            .map(|p| p.id.clone()))
    }

    async fn postings(&self, ids: &[String]) -> Result<Vec<Posting>, StoreError> {
        self.check_reads()?;
        let postings = self.postings.read();
        Ok(ids.iter().filter_map(|id| postings.get(id).cloned()).collect())
    }

    async fn stale_postings(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        self.check_reads()?;
        Ok(self
            .postings
            .read()
            .values()
            .filter(|p| p.embedding_checksum.is_none())
            .take(limit)
            .map(|p| p.id.clone())
            .collect())
    }
}

#[async_trait]
impl SnapshotLog for InMemoryStore {
    async fn append(&self, snapshots: Vec<ScoreSnapshot>) -> Result<(), StoreError> {
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "snapshot log disabled".to_string(),
            });
        }
        self.snapshots.lock().extend(snapshots);
        Ok(())
    }
}

#[async_trait]
impl FreshnessQueue for InMemoryStore {
    async fn enqueue(
        &self,
        kind: QueueKind,
        entity_id: &str,
        reason: QueueReason,
    ) -> Result<QueueEntry, StoreError> {
        let mut queue = self.queue.lock();
        if let Some(existing) = queue
            .iter()
            .find(|e| e.kind == kind && e.entity_id == entity_id && e.is_pending())
        {
            return Ok(existing.clone());
        }

        let entry = QueueEntry::new(kind, entity_id, reason);
        queue.push(entry.clone());
        Ok(entry)
    }

    async fn claim(
        &self,
        kind: QueueKind,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<QueueEntry>, StoreError> {
        Ok(self.claim_at(kind, limit, lease, Utc::now()))
    }

    async fn complete(&self, entry: &QueueEntry) -> Result<(), StoreError> {
        let mut queue = self.queue.lock();
        let stored = queue
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| StoreError::EntryNotFound {
                id: entry.id.clone(),
            })?;
        stored.processed_at = Some(Utc::now());
        stored.claimed_until = None;
        Ok(())
    }

    async fn record_checksum(
        &self,
        kind: QueueKind,
        entity_id: &str,
        checksum: &str,
    ) -> Result<(), StoreError> {
        match kind {
            QueueKind::Query => {
                if let Some(profile) = self.profiles.write().get_mut(entity_id) {
                    profile.embedding_checksum = Some(checksum.to_string());
                }
            }
            QueueKind::Item => {
                if let Some(posting) = self.postings.write().get_mut(entity_id) {
                    posting.embedding_checksum = Some(checksum.to_string());
                }
            }
        }
        Ok(())
    }
}
