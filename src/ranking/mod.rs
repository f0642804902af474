//! The ranking pipeline: retrieve, aggregate, rerank, judge, penalize, persist.
//!
//! [`Orchestrator`] owns the stage order and every degrade-or-abort decision. Only two
//! conditions abort a call: a seeker the store reports as unknown, and a vector index that
//! cannot serve retrieval. A store that fails while loading the seeker degrades to an empty
//! profile, so ranking falls back to vector scores. A seeker without vectors yields an empty
//! result and a freshness queue entry. Every later stage is best-effort and logs a warning when
//! it is skipped.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{EngineConfig, StageTimeouts};
pub use error::RankingError;
pub use orchestrator::Orchestrator;
pub use types::{RankOptions, RankingOutcome, Stage};
