use serde::{Deserialize, Serialize};

use super::types::ScoredResult;
use crate::facet::{Facet, FacetScores, FacetWeights, RequiredFacets};
use crate::judge::JudgeVerdict;

/// Tunables for combining vector-side facet scores with judge facet scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Judge weight before any agreement adjustment.
    pub base_alpha: f64,
    /// Added to alpha when vector and judge agree closely.
    pub agreement_boost: f64,
    /// Deltas up to this get the full boost.
    pub boost_full_delta: f64,
    /// The boost has decayed to zero at this delta.
    pub boost_zero_delta: f64,
    /// Subtracted from alpha when the two sides disagree strongly.
    pub disagreement_drop: f64,
    /// The drop starts growing past this delta.
    pub drop_start_delta: f64,
    /// Deltas from here up get the full drop.
    pub drop_full_delta: f64,
    pub min_alpha: f64,
    pub max_alpha: f64,
    /// Skills/experience ceiling applied to both sides on a domain mismatch.
    pub mismatch_cap: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            base_alpha: 0.50,
            agreement_boost: 0.15,
            boost_full_delta: 5.0,
            boost_zero_delta: 15.0,
            disagreement_drop: 0.20,
            drop_start_delta: 25.0,
            drop_full_delta: 50.0,
            min_alpha: 0.05,
            max_alpha: 0.65,
            mismatch_cap: 5.0,
        }
    }
}

/// Judge weight for one facet given the two sides' scores.
pub fn adaptive_alpha(vector: f64, judge: f64, config: &FusionConfig) -> f64 {
    let delta = (vector - judge).abs();

    let boost = ramp_down(delta, config.boost_full_delta, config.boost_zero_delta)
        * config.agreement_boost;
    let drop =
        ramp_up(delta, config.drop_start_delta, config.drop_full_delta) * config.disagreement_drop;

    (config.base_alpha + boost - drop).clamp(config.min_alpha, config.max_alpha)
}

/// 1 at or below `full`, 0 at or above `zero`, linear between.
fn ramp_down(x: f64, full: f64, zero: f64) -> f64 {
    if x <= full {
        1.0
    } else if x >= zero {
        0.0
    } else {
        (zero - x) / (zero - full)
    }
}

/// 0 at or below `start`, 1 at or above `full`, linear between.
fn ramp_up(x: f64, start: f64, full: f64) -> f64 {
    if x <= start {
        0.0
    } else if x >= full {
        1.0
    } else {
        (x - start) / (full - start)
    }
}

/// A judge verdict with its numbers normalized against the rest of its batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedVerdict {
    pub verdict: JudgeVerdict,
    pub facet_scores: FacetScores,
    pub overall: Option<f64>,
}

/// Min-max normalizes each facet column (and overall) across the batch onto 0–100.
///
/// A column whose values are all equal, which includes any batch of one, keeps its raw values
/// clamped to 0–100.
pub fn calibrate_batch(verdicts: Vec<JudgeVerdict>) -> Vec<CalibratedVerdict> {
    let mut calibrated: Vec<CalibratedVerdict> = verdicts
        .into_iter()
        .map(|verdict| CalibratedVerdict {
            facet_scores: FacetScores::new(),
            overall: None,
            verdict,
        })
        .collect();

    for facet in Facet::ALL {
        let column: Vec<(usize, f64)> = calibrated
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.verdict.facet_scores.get(&facet).map(|v| (i, *v)))
            .collect();
        for (i, value) in normalize_column(&column) {
            calibrated[i].facet_scores.insert(facet, value);
        }
    }

    let overall: Vec<(usize, f64)> = calibrated
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.verdict.overall.map(|v| (i, v)))
        .collect();
    for (i, value) in normalize_column(&overall) {
        calibrated[i].overall = Some(value);
    }

    calibrated
}

fn normalize_column(column: &[(usize, f64)]) -> Vec<(usize, f64)> {
    let (lo, hi) = column
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });

    if column.is_empty() || hi - lo <= f64::EPSILON {
        return column
            .iter()
            .map(|(i, v)| (*i, v.clamp(0.0, 100.0)))
            .collect();
    }

    column
        .iter()
        .map(|(i, v)| (*i, 100.0 * (v - lo) / (hi - lo)))
        .collect()
}

/// Fuses a calibrated judge verdict into `result`.
///
/// Effective weights become `weights` with every facet the posting does not require zeroed;
/// the overall is then recomputed from the fused breakdown.
pub fn fuse(
    result: &mut ScoredResult,
    judged: &CalibratedVerdict,
    required: RequiredFacets,
    weights: &FacetWeights,
    config: &FusionConfig,
) {
    let verdict = &judged.verdict;
    let mut vector = result.facet_scores.clone();
    let mut judge = judged.facet_scores.clone();

    if verdict.domain_mismatch {
        for scores in [&mut vector, &mut judge] {
            for facet in Facet::ALL {
                let Some(score) = scores.get_mut(&facet) else {
                    continue;
                };
                if !required.contains(facet) {
                    *score = 0.0;
                } else if facet.is_always_required() {
                    *score = score.min(config.mismatch_cap);
                }
            }
        }
    }

    let mut fused = FacetScores::new();
    for facet in Facet::ALL {
        let value = match (vector.get(&facet), judge.get(&facet)) {
            (Some(v), Some(j)) => {
                let alpha = adaptive_alpha(*v, *j, config);
                (1.0 - alpha) * v + alpha * j
            }
            (Some(v), None) => *v,
            (None, Some(j)) => *j,
            (None, None) => continue,
        };
        fused.insert(facet, value);
    }

    result.facet_scores = fused;
    result.effective_weights = weights.masked(&required);
    result.recompute_overall();

    result.signals.judge_overall = verdict.overall;
    result.analysis.domain_mismatch = verdict.domain_mismatch;
    if let Some(rationale) = verdict.rationale.as_ref().filter(|r| !r.trim().is_empty()) {
        result.analysis.rationale = Some(rationale.clone());
    }

    let mut skills = result.analysis.skills();
    let names: Vec<&str> = verdict.matched.iter().map(|m| m.name.as_str()).collect();
    skills.absorb_judge_matches(&names);
    result.analysis.set_skills(skills);

    for attribute in &verdict.matched {
        if let Some(evidence) = attribute.evidence.as_ref().filter(|e| !e.is_empty()) {
            result
                .analysis
                .evidence
                .insert(attribute.name.clone(), evidence.clone());
        }
    }
}
