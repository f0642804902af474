use std::collections::HashMap;

use super::calibration::CalibrationConfig;
use super::types::{ScoredResult, sort_results};
use crate::facet::{Facet, FacetScores, FacetWeights};
use crate::vectordb::SearchResult;

/// A single retrieval hit resolved to `(item, facet)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetHit {
    pub item_id: String,
    pub facet: Facet,
    pub raw_score: f64,
}

impl FacetHit {
    /// Resolves a hit from its `"<item_id>:<facet>"` id. Malformed ids yield `None`.
    pub fn from_search_result(result: &SearchResult) -> Option<Self> {
        let (item_id, facet) = Facet::parse_vector_id(&result.id)?;
        Some(Self {
            item_id: item_id.to_string(),
            facet,
            raw_score: f64::from(result.score),
        })
    }
}

/// Groups hits by item, keeps the best calibrated score per facet, and produces hybrid-scored
/// results sorted best first.
///
/// Items with fewer than `min_facets` distinct facets (clamped to at least 1) are dropped, as
/// are items whose facets carry no positive weight. Each result's effective weights are the
/// configured weights of the facets it was found on.
pub fn aggregate<I>(
    hits: I,
    calibration: &CalibrationConfig,
    weights: &FacetWeights,
    min_facets: usize,
) -> Vec<ScoredResult>
where
    I: IntoIterator<Item = FacetHit>,
{
    let min_facets = min_facets.max(1);

    let mut per_item: HashMap<String, FacetScores> = HashMap::new();
    for hit in hits {
        let score = calibration.calibrate(hit.raw_score);
        let facets = per_item.entry(hit.item_id).or_default();
        facets
            .entry(hit.facet)
            .and_modify(|best| {
                if score > *best {
                    *best = score;
                }
            })
            .or_insert(score);
    }

    let mut results: Vec<ScoredResult> = per_item
        .into_iter()
        .filter(|(_, scores)| scores.len() >= min_facets)
        .filter_map(|(item_id, scores)| {
            let effective = weights.restricted_to(scores.keys());
            if effective.total_for(&scores) <= 0.0 {
                return None;
            }
            Some(ScoredResult::new(item_id, scores, effective))
        })
        .collect();

    sort_results(&mut results);
    results
}
