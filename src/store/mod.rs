//! Relational persistence consumed by the ranking engine.
//!
//! Three narrow traits cover what the engine needs:
//!
//! - [`EntityStore`]: read seeker profiles and postings.
//! - [`SnapshotLog`]: append immutable score snapshots (never read back by the engine).
//! - [`FreshnessQueue`]: the re-embedding work queue, with atomic leased claims.
//!
//! [`InMemoryStore`] implements all three under a single lock; [`PostgrestStore`] talks to a
//! PostgREST endpoint. [`CachedEntityStore`] adds a read-through cache over any entity store.

pub mod cached;
pub mod error;
pub mod memory;
pub mod postgrest;
pub mod rows;
pub mod types;

#[cfg(test)]
mod tests;

pub use cached::CachedEntityStore;
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgrest::{PostgrestConfig, PostgrestStore};
pub use types::{QueueEntry, QueueKind, QueueReason, ScoreSnapshot};

use async_trait::async_trait;
use std::time::Duration;

use crate::entity::{Posting, Profile};

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Resolves a unique external key (email) to a profile id.
    async fn profile_id_by_lookup_key(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Postings for the ids that exist. Order is not significant.
    async fn postings(&self, ids: &[String]) -> Result<Vec<Posting>, StoreError>;

    /// Ids of up to `limit` postings whose vectors were never built.
    async fn stale_postings(&self, limit: usize) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait SnapshotLog: Send + Sync {
    async fn append(&self, snapshots: Vec<ScoreSnapshot>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FreshnessQueue: Send + Sync {
    /// Adds an entry, or returns the pending entry already queued for the same entity.
    async fn enqueue(
        &self,
        kind: QueueKind,
        entity_id: &str,
        reason: QueueReason,
    ) -> Result<QueueEntry, StoreError>;

    /// Atomically leases up to `limit` unprocessed entries of `kind`, oldest first.
    ///
    /// Claimed entries are invisible to other claimers until `lease` elapses.
    async fn claim(
        &self,
        kind: QueueKind,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<QueueEntry>, StoreError>;

    /// Marks an entry processed.
    async fn complete(&self, entry: &QueueEntry) -> Result<(), StoreError>;

    /// Stores the checksum of the text an entity's vectors were built from.
    async fn record_checksum(
        &self,
        kind: QueueKind,
        entity_id: &str,
        checksum: &str,
    ) -> Result<(), StoreError>;
}
