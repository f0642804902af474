use super::error::ScoringError;
use super::types::{ScoredResult, sort_results};
use crate::constants::FLAT_BATCH_SCORE;

/// Min-max normalizes to 0–100. A flat batch (or one with no finite spread) maps every value to
/// the midpoint; non-finite values map to 0.
pub fn minmax_to_0_100(values: &[f64]) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !lo.is_finite() || !hi.is_finite() || hi - lo <= f64::EPSILON {
        return values
            .iter()
            .map(|v| if v.is_finite() { FLAT_BATCH_SCORE } else { 0.0 })
            .collect();
    }

    values
        .iter()
        .map(|v| {
            if v.is_finite() {
                100.0 * (v - lo) / (hi - lo)
            } else {
                0.0
            }
        })
        .collect()
}

/// Blends a normalized reranker score into every facet of `result`:
/// `s_f = alpha * s_f + (1 - alpha) * reranked`. The weighted overall moves the same way.
pub fn blend(result: &mut ScoredResult, reranked: f64, alpha: f64) {
    for score in result.facet_scores.values_mut() {
        *score = alpha * *score + (1.0 - alpha) * reranked;
    }
    result.signals.reranked = Some(reranked);
    result.recompute_overall();
}

/// Applies raw reranker scores to the leading `raw_scores.len()` results and re-sorts the
/// whole slice.
///
/// Results past the scored prefix are left untouched.
pub fn apply_rerank(
    results: &mut [ScoredResult],
    raw_scores: &[f32],
    alpha: f64,
) -> Result<(), ScoringError> {
    if raw_scores.len() > results.len() {
        return Err(ScoringError::InvalidInput {
            reason: format!(
                "{} reranker scores for {} results",
                raw_scores.len(),
                results.len()
            ),
        });
    }

    let raw: Vec<f64> = raw_scores.iter().map(|s| f64::from(*s)).collect();
    let normalized = minmax_to_0_100(&raw);

    for (result, reranked) in results.iter_mut().zip(normalized) {
        blend(result, reranked, alpha);
    }

    sort_results(results);
    Ok(())
}
