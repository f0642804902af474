use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::penalty::Penalty;
use crate::entity::SkillAnalysis;
use crate::facet::{FacetScores, FacetWeights, weighted_overall};

/// One ranked posting with its score breakdown.
///
/// `overall` is derived from `facet_scores` and `effective_weights`; every stage that touches
/// either calls [`ScoredResult::recompute_overall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub item_id: String,
    pub facet_scores: FacetScores,
    pub effective_weights: FacetWeights,
    pub overall: f64,
    pub analysis: MatchAnalysis,
    pub signals: SignalTrace,
}

impl ScoredResult {
    pub fn new(
        item_id: impl Into<String>,
        facet_scores: FacetScores,
        effective_weights: FacetWeights,
    ) -> Self {
        let overall = weighted_overall(&facet_scores, &effective_weights);
        Self {
            item_id: item_id.into(),
            facet_scores,
            effective_weights,
            overall,
            analysis: MatchAnalysis::default(),
            signals: SignalTrace {
                hybrid: overall,
                ..Default::default()
            },
        }
    }

    pub fn recompute_overall(&mut self) {
        self.overall = weighted_overall(&self.facet_scores, &self.effective_weights);
    }

    /// `true` when `overall` matches the weighted mean of the breakdown.
    pub fn is_consistent(&self) -> bool {
        (self.overall - weighted_overall(&self.facet_scores, &self.effective_weights)).abs()
            < 1e-9
    }
}

/// Skill coverage plus judge-provided explanation for one result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub required: Vec<String>,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub coverage: f64,
    pub rationale: Option<String>,
    pub domain_mismatch: bool,
    /// Matched requirement → short supporting evidence.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub evidence: BTreeMap<String, String>,
}

impl MatchAnalysis {
    pub fn skills(&self) -> SkillAnalysis {
        SkillAnalysis {
            required: self.required.clone(),
            matched: self.matched.clone(),
            missing: self.missing.clone(),
            coverage: self.coverage,
        }
    }

    pub fn set_skills(&mut self, skills: SkillAnalysis) {
        self.required = skills.required;
        self.matched = skills.matched;
        self.missing = skills.missing;
        self.coverage = skills.coverage;
    }
}

impl From<SkillAnalysis> for MatchAnalysis {
    fn from(skills: SkillAnalysis) -> Self {
        let mut analysis = MatchAnalysis::default();
        analysis.set_skills(skills);
        analysis
    }
}

/// Per-stage values kept for inspection only. None of these feed `overall`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalTrace {
    /// Weighted vector-similarity score from aggregation.
    pub hybrid: f64,
    /// Batch-normalized reranker score, when this result was reranked.
    pub reranked: Option<f64>,
    /// The judge's self-reported overall.
    pub judge_overall: Option<f64>,
    /// Overall just before penalties.
    pub pre_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub penalties: Vec<Penalty>,
}

/// Sorts best first; ties go to the lexicographically smaller item id.
pub fn sort_results(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| {
        b.overall
            .partial_cmp(&a.overall)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
}
