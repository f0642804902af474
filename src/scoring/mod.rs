//! Score computation for ranked postings.
//!
//! Every function here is pure. Stages hand a `Vec<ScoredResult>` along:
//!
//! 1. [`aggregate`] turns per-facet retrieval hits into hybrid-scored results using
//!    [`calibration`].
//! 2. [`rerank`] blends a batch-normalized cross-encoder score into the best results.
//! 3. [`fusion`] merges batch-calibrated judge verdicts facet by facet.
//! 4. [`penalty`] caps or scales weakly evidenced results and rescales their facets.
//!
//! After each step a result's `overall` equals the rounded weighted mean of its
//! `facet_scores` under its `effective_weights`.

pub mod aggregate;
pub mod calibration;
pub mod error;
pub mod fusion;
pub mod penalty;
pub mod rationale;
pub mod rerank;
pub mod types;


pub use aggregate::{FacetHit, aggregate};
pub use calibration::{CalibrationConfig, calibrate};
pub use error::ScoringError;
pub use fusion::{CalibratedVerdict, FusionConfig, adaptive_alpha, calibrate_batch, fuse};
pub use penalty::{Penalty, PenaltyConfig, PenaltyOutcome};
pub use rationale::fallback_rationale;
pub use rerank::{apply_rerank, blend, minmax_to_0_100};
pub use types::{MatchAnalysis, ScoredResult, SignalTrace, sort_results};
