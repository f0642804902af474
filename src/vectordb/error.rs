use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by vector index operations.
pub enum VectorDbError {
    /// Could not connect to the index endpoint.
    #[error("failed to connect to vector index at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Upsert failed.
    #[error("failed to upsert points to '{namespace}': {message}")]
    UpsertFailed {
        /// Namespace name.
        namespace: String,
        /// Error message.
        message: String,
    },

    /// Delete by id failed.
    #[error("failed to delete points from '{namespace}': {message}")]
    DeleteFailed {
        /// Namespace name.
        namespace: String,
        /// Error message.
        message: String,
    },

    /// Similarity query failed.
    #[error("failed to query '{namespace}': {message}")]
    QueryFailed {
        /// Namespace name.
        namespace: String,
        /// Error message.
        message: String,
    },

    /// Fetch by id failed.
    #[error("failed to fetch points from '{namespace}': {message}")]
    FetchFailed {
        /// Namespace name.
        namespace: String,
        /// Error message.
        message: String,
    },

    /// Vector dimension mismatch.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// The index did not answer within the stage deadline.
    #[error("vector index timed out after {millis}ms")]
    Timeout {
        /// Elapsed budget in milliseconds.
        millis: u64,
    },
}
