use serde::{Deserialize, Serialize};

use super::types::ScoredResult;
use crate::facet::{Facet, FacetScores, FacetWeights, weighted_mean, weighted_overall};

/// Evidence thresholds below which a result's overall is capped or scaled down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// Experience below this caps the overall at `experience_cap`.
    pub experience_floor: f64,
    pub experience_cap: f64,
    /// Experience below this (and at least the floor) scales the overall.
    pub experience_weak: f64,
    pub experience_weak_factor: f64,
    /// Coverage below this caps the overall at `coverage_cap`.
    pub coverage_floor: f64,
    pub coverage_cap: f64,
    pub coverage_low: f64,
    pub coverage_low_factor: f64,
    pub coverage_partial: f64,
    pub coverage_partial_factor: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            experience_floor: 15.0,
            experience_cap: 15.0,
            experience_weak: 28.0,
            experience_weak_factor: 0.60,
            coverage_floor: 0.10,
            coverage_cap: 8.0,
            coverage_low: 0.30,
            coverage_low_factor: 0.45,
            coverage_partial: 0.50,
            coverage_partial_factor: 0.70,
        }
    }
}

/// A penalty that fired for a result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Penalty {
    ExperienceCap { experience: f64, cap: f64 },
    ExperienceScaled { experience: f64, factor: f64 },
    CoverageCap { coverage: f64, cap: f64 },
    CoverageScaled { coverage: f64, factor: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyOutcome {
    pub facet_scores: FacetScores,
    /// Overall recomputed from the rescaled facets.
    pub overall: f64,
    /// Unrounded overall the penalties started from.
    pub pre_penalty: f64,
    pub applied: Vec<Penalty>,
}

/// Applies the experience and coverage guards, then rescales every facet by the same factor
/// so the breakdown averages to the penalized overall.
///
/// A missing experience facet counts as 0.
pub fn compute(
    facet_scores: &FacetScores,
    weights: &FacetWeights,
    coverage: f64,
    config: &PenaltyConfig,
) -> PenaltyOutcome {
    let pre = weighted_mean(facet_scores, weights);
    let mut harsh = pre;
    let mut applied = Vec::new();

    let experience = facet_scores
        .get(&Facet::Experience)
        .copied()
        .unwrap_or(0.0);
    if experience < config.experience_floor {
        harsh = harsh.min(config.experience_cap);
        applied.push(Penalty::ExperienceCap {
            experience,
            cap: config.experience_cap,
        });
    } else if experience < config.experience_weak {
        harsh *= config.experience_weak_factor;
        applied.push(Penalty::ExperienceScaled {
            experience,
            factor: config.experience_weak_factor,
        });
    }

    if coverage < config.coverage_floor {
        harsh = harsh.min(config.coverage_cap);
        applied.push(Penalty::CoverageCap {
            coverage,
            cap: config.coverage_cap,
        });
    } else if coverage < config.coverage_low {
        harsh *= config.coverage_low_factor;
        applied.push(Penalty::CoverageScaled {
            coverage,
            factor: config.coverage_low_factor,
        });
    } else if coverage < config.coverage_partial {
        harsh *= config.coverage_partial_factor;
        applied.push(Penalty::CoverageScaled {
            coverage,
            factor: config.coverage_partial_factor,
        });
    }

    let mut rescaled = facet_scores.clone();
    if pre > 0.0 && harsh < pre {
        let factor = harsh / pre;
        for score in rescaled.values_mut() {
            *score *= factor;
        }
    }

    PenaltyOutcome {
        overall: weighted_overall(&rescaled, weights),
        facet_scores: rescaled,
        pre_penalty: pre,
        applied,
    }
}

/// Runs [`compute`] against a result in place, recording what fired in its signals.
pub fn apply(result: &mut ScoredResult, config: &PenaltyConfig) {
    let outcome = compute(
        &result.facet_scores,
        &result.effective_weights,
        result.analysis.coverage,
        config,
    );

    result.signals.pre_penalty = Some(crate::constants::round2(outcome.pre_penalty));
    result.signals.penalties = outcome.applied;
    result.facet_scores = outcome.facet_scores;
    result.overall = outcome.overall;
}
