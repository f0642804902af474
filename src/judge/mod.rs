//! Contextual relevance judgments from a chat model.
//!
//! The ranking pipeline sends one batched request per call: a seeker's [`QueryContext`] and
//! the [`ItemContext`] of each posting under consideration. The judge answers with one
//! [`JudgeVerdict`] per posting. Replies are parsed leniently by [`parse::parse_verdicts`];
//! anything that does not have the expected shape is a [`JudgeError::MalformedOutput`].

pub mod config;
pub mod error;
pub mod provider;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod parse;
pub mod prompt;
pub mod types;


pub use config::{JudgeConfig, JudgeProvider};
pub use error::JudgeError;
pub use provider::GenaiJudge;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockJudge;
pub use parse::{parse_verdicts, trim_to_two_sentences};
pub use types::{ItemContext, JudgeVerdict, MatchedAttribute, QueryContext};

use async_trait::async_trait;

/// Scores a batch of postings for one seeker.
#[async_trait]
pub trait LlmJudge: Send + Sync {
    /// One verdict per posting the judge chose to answer for. Order is not significant.
    async fn score_batch(
        &self,
        query: &QueryContext,
        items: &[ItemContext],
    ) -> Result<Vec<JudgeVerdict>, JudgeError>;

    /// Model identifier recorded with persisted scores.
    fn model_id(&self) -> &str;
}
