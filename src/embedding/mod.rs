//! Pairwise relevance models.
//!
//! [`Reranker`] wraps a BERT cross-encoder (or a lexical-overlap stub when no weights are
//! configured) behind the [`PairwiseScorer`] trait the ranking pipeline consumes.

/// BERT sequence-classification head used by the cross-encoder.
pub mod bert;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// Cross-encoder reranker.
pub mod reranker;
/// Tokenizer loading helpers.
pub mod utils;

pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockScorer;
pub use reranker::{
    DEFAULT_RERANKER_MODEL_ID, PairwiseScorer, Reranker, RerankerConfig, RerankerError,
};
