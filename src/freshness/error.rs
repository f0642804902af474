use thiserror::Error;

use crate::store::StoreError;
use crate::vectordb::VectorDbError;

#[derive(Debug, Error)]
pub enum FreshnessError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("vector index error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("embedding failed: {reason}")]
    Embedding { reason: String },

    #[error("embedder returned {actual} vectors for {expected} texts")]
    EmbeddingCountMismatch { expected: usize, actual: usize },
}

pub type FreshnessResult<T> = Result<T, FreshnessError>;
