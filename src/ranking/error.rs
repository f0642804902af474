use thiserror::Error;

use crate::store::StoreError;

/// Failures that abort a ranking call. Everything else degrades to a best-effort result.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("unknown job seeker: {id}")]
    UnknownQuery { id: String },

    #[error("no job seeker with lookup key {key}")]
    UnknownLookupKey { key: String },

    /// Retrieval could not evaluate a single facet.
    #[error("no candidates could be evaluated: {reason}")]
    NoCandidatesEvaluated { reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("store timed out after {millis}ms")]
    StoreTimeout { millis: u64 },
}
