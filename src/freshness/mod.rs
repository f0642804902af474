//! Keeps facet vectors in step with the entities they were built from.
//!
//! [`FreshnessWorker`] drains the freshness queue: it claims a leased batch, skips entities
//! whose stored checksum still matches their text, re-embeds the rest through a
//! [`VectorRefresher`], records the new checksum and marks the entry processed. Entries whose
//! refresh fails are left alone and become claimable again once their lease expires.

pub mod error;
pub mod refresher;
pub mod worker;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use error::{FreshnessError, FreshnessResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;
pub use refresher::{FacetEmbedder, IndexRefresher, RefreshTarget, VectorRefresher};
pub use worker::{
    DEFAULT_BATCH_SIZE, DEFAULT_IDLE_SLEEP, DEFAULT_LEASE, DrainReport, FreshnessConfig,
    FreshnessWorker,
};
