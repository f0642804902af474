//! Matchfuse library crate (used by the CLI and integration tests).
//!
//! # Public API Surface
//!
//! ## Ranking
//! - [`Orchestrator`], [`EngineConfig`], [`RankOptions`], [`RankingOutcome`] - The pipeline
//! - [`ScoredResult`], [`MatchAnalysis`] - What a ranking returns
//!
//! ## Signals
//! - [`VectorIndex`], [`QdrantIndex`] - Per-facet vector retrieval
//! - [`PairwiseScorer`], [`Reranker`] - Cross-encoder reranking
//! - [`LlmJudge`], [`GenaiJudge`] - Contextual judgments
//!
//! ## Persistence
//! - [`EntityStore`], [`SnapshotLog`], [`FreshnessQueue`] - Store seams
//! - [`PostgrestStore`], [`CachedEntityStore`], [`InMemoryStore`] - Implementations
//! - [`FreshnessWorker`], [`IndexRefresher`] - Keeps facet vectors current
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod embedding;
pub mod entity;
pub mod facet;
pub mod freshness;
pub mod hashing;
pub mod judge;
pub mod ranking;
pub mod scoring;
pub mod store;
pub mod vectordb;

pub use config::{Config, ConfigError};
pub use constants::round2;
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockScorer;
pub use embedding::{EmbeddingError, PairwiseScorer, Reranker, RerankerConfig, RerankerError};
pub use entity::{Posting, Profile, SkillAnalysis};
pub use facet::{Facet, FacetScores, FacetWeights, RequiredFacets};
#[cfg(any(test, feature = "mock"))]
pub use freshness::MockEmbedder;
pub use freshness::{
    FacetEmbedder, FreshnessConfig, FreshnessError, FreshnessWorker, IndexRefresher,
    RefreshTarget, VectorRefresher,
};
pub use hashing::{content_checksum, hash_to_u64, point_id};
#[cfg(any(test, feature = "mock"))]
pub use judge::MockJudge;
pub use judge::{GenaiJudge, JudgeConfig, JudgeError, JudgeVerdict, LlmJudge};
pub use ranking::{
    EngineConfig, Orchestrator, RankOptions, RankingError, RankingOutcome, Stage, StageTimeouts,
};
pub use scoring::{
    CalibrationConfig, FusionConfig, MatchAnalysis, PenaltyConfig, ScoredResult, ScoringError,
};
pub use store::{
    CachedEntityStore, EntityStore, FreshnessQueue, InMemoryStore, PostgrestConfig,
    PostgrestStore, QueueEntry, QueueKind, QueueReason, ScoreSnapshot, SnapshotLog, StoreError,
};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorIndex;
pub use vectordb::{QdrantIndex, SearchResult, VectorDbError, VectorIndex, VectorPoint};
