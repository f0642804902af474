use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use crate::constants::{DEFAULT_MIN_FACETS, DEFAULT_TOP_K_PER_FACET};
use crate::facet::{Facet, FacetWeights};
use crate::scoring::ScoredResult;

/// Per-call ranking parameters.
#[derive(Debug, Clone)]
pub struct RankOptions {
    pub top_k_per_facet: u64,
    /// Minimum number of facets an item must match to be kept (at least 1).
    pub min_facets: usize,
    /// Per-facet weight overrides; facets not listed keep their default weight.
    pub weights: Option<HashMap<Facet, f64>>,
    /// Hard bound on the whole call.
    pub deadline: Option<Instant>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            top_k_per_facet: DEFAULT_TOP_K_PER_FACET,
            min_facets: DEFAULT_MIN_FACETS,
            weights: None,
            deadline: None,
        }
    }
}

impl RankOptions {
    pub fn with_top_k_per_facet(mut self, top_k: u64) -> Self {
        self.top_k_per_facet = top_k;
        self
    }

    pub fn with_min_facets(mut self, min_facets: usize) -> Self {
        self.min_facets = min_facets;
        self
    }

    pub fn with_weight(mut self, facet: Facet, weight: f64) -> Self {
        self.weights.get_or_insert_with(HashMap::new).insert(facet, weight);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn facet_weights(&self) -> FacetWeights {
        FacetWeights::with_overrides(self.weights.as_ref())
    }
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Vector,
    Rerank,
    Judge,
    Penalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Vector => "vector",
            Stage::Rerank => "rerank",
            Stage::Judge => "judge",
            Stage::Penalize => "penalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingOutcome {
    /// Best first.
    pub results: Vec<ScoredResult>,
    pub completed_stages: Vec<Stage>,
}

impl RankingOutcome {
    pub fn ran(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// `+`-joined scoring stages that ran, e.g. `vector+rerank+judge`.
    pub fn method(&self) -> String {
        self.completed_stages
            .iter()
            .filter(|s| **s != Stage::Penalize)
            .map(Stage::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}
