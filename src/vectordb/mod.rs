//! Vector index integration.
//!
//! The engine only needs the three operations of [`VectorIndex`]. [`QdrantIndex`] is the
//! production adapter; [`MockVectorIndex`] is an in-memory stand-in for tests.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::{QdrantIndex, VectorIndex};
pub use error::VectorDbError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockVectorIndex, cosine_similarity};
pub use model::{SearchFilter, SearchResult, VectorPoint};

/// Payload key holding the string vector id (`"<entity_id>:<facet>"`).
pub const POINT_KEY_FIELD: &str = "point_key";
/// Payload key holding the facet name; the per-facet query filter matches on it.
pub const FACET_FIELD: &str = "facet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteConsistency {
    /// Wait for the operation to be fully indexed and searchable.
    /// Maps to `wait=true`.
    Strong,
    /// Return immediately after the server acknowledges receipt.
    /// Maps to `wait=false`.
    Eventual,
}

impl From<WriteConsistency> for bool {
    fn from(c: WriteConsistency) -> bool {
        matches!(c, WriteConsistency::Strong)
    }
}
