//! Facets: the scored dimensions of a seeker/posting comparison.
//!
//! Every score breakdown in the crate is a [`FacetScores`] map paired with the
//! [`FacetWeights`] that were in effect when its overall value was computed. The overall is
//! always derived from the pair with [`weighted_overall`], never stored independently.


use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::constants::round2;

/// One scored dimension of comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Skills,
    Experience,
    Education,
    Licenses,
}

impl Facet {
    /// All facets, in canonical order.
    pub const ALL: [Facet; 4] = [
        Facet::Skills,
        Facet::Experience,
        Facet::Education,
        Facet::Licenses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Skills => "skills",
            Facet::Experience => "experience",
            Facet::Education => "education",
            Facet::Licenses => "licenses",
        }
    }

    /// `skills` and `experience` are required for every posting.
    pub fn is_always_required(&self) -> bool {
        matches!(self, Facet::Skills | Facet::Experience)
    }

    /// Default weight (sums to 1.0 across [`Facet::ALL`]).
    pub fn default_weight(&self) -> f64 {
        match self {
            Facet::Skills => 0.40,
            Facet::Experience => 0.30,
            Facet::Education => 0.15,
            Facet::Licenses => 0.15,
        }
    }

    /// Builds the vector id for `entity_id` and this facet.
    pub fn vector_id(&self, entity_id: &str) -> String {
        format!(
            "{}{}{}",
            entity_id,
            crate::constants::VECTOR_ID_SEPARATOR,
            self.as_str()
        )
    }

    /// Splits a vector id into `(entity_id, facet)`. Returns `None` for malformed ids.
    pub fn parse_vector_id(id: &str) -> Option<(&str, Facet)> {
        let (entity, facet) = id.split_once(crate::constants::VECTOR_ID_SEPARATOR)?;
        if entity.is_empty() {
            return None;
        }
        Some((entity, facet.parse().ok()?))
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skills" => Ok(Facet::Skills),
            "experience" => Ok(Facet::Experience),
            "education" => Ok(Facet::Education),
            "licenses" | "licenses_certifications" => Ok(Facet::Licenses),
            other => Err(format!("unknown facet: {}", other)),
        }
    }
}

/// Facet → score (0–100) map.
pub type FacetScores = BTreeMap<Facet, f64>;

/// Facet → weight map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetWeights(BTreeMap<Facet, f64>);

impl Default for FacetWeights {
    fn default() -> Self {
        Self(Facet::ALL.iter().map(|f| (*f, f.default_weight())).collect())
    }
}

impl FacetWeights {
    /// Weights with no facets (used as a starting point for effective weights).
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Defaults overridden by any facet present in `overrides`.
    pub fn with_overrides(overrides: Option<&HashMap<Facet, f64>>) -> Self {
        let mut weights = Self::default();
        if let Some(overrides) = overrides {
            for (facet, weight) in overrides {
                if weight.is_finite() {
                    weights.0.insert(*facet, *weight);
                }
            }
        }
        weights
    }

    pub fn get(&self, facet: Facet) -> f64 {
        self.0.get(&facet).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, facet: Facet, weight: f64) {
        self.0.insert(facet, weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Facet, f64)> + '_ {
        self.0.iter().map(|(f, w)| (*f, *w))
    }

    /// Sum of weights over facets present in `scores`.
    pub fn total_for(&self, scores: &FacetScores) -> f64 {
        scores.keys().map(|f| self.get(*f).max(0.0)).sum()
    }

    /// Restricts to the facets in `facets`, keeping their weights.
    pub fn restricted_to<'a>(&self, facets: impl IntoIterator<Item = &'a Facet>) -> Self {
        Self(facets.into_iter().map(|f| (*f, self.get(*f))).collect())
    }

    /// Zeroes every facet the posting does not require.
    pub fn masked(&self, required: &RequiredFacets) -> Self {
        Self(
            Facet::ALL
                .iter()
                .map(|f| {
                    let w = if required.contains(*f) {
                        self.get(*f)
                    } else {
                        0.0
                    };
                    (*f, w)
                })
                .collect(),
        )
    }

    pub fn as_map(&self) -> &BTreeMap<Facet, f64> {
        &self.0
    }
}

/// Which facets a posting requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequiredFacets {
    pub education: bool,
    pub licenses: bool,
}

impl RequiredFacets {
    pub fn contains(&self, facet: Facet) -> bool {
        match facet {
            Facet::Skills | Facet::Experience => true,
            Facet::Education => self.education,
            Facet::Licenses => self.licenses,
        }
    }

    pub fn all() -> Self {
        Self {
            education: true,
            licenses: true,
        }
    }
}

/// Weighted mean of `scores` under `weights` at full precision.
///
/// Facets with non-positive weight contribute nothing. Returns 0 when no facet carries weight.
pub fn weighted_mean(scores: &FacetScores, weights: &FacetWeights) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (facet, score) in scores {
        let w = weights.get(*facet);
        if w <= 0.0 {
            continue;
        }
        weighted += w * score;
        total += w;
    }
    if total <= 0.0 { 0.0 } else { weighted / total }
}

/// The displayed overall for a breakdown: [`weighted_mean`] rounded to two decimals.
pub fn weighted_overall(scores: &FacetScores, weights: &FacetWeights) -> f64 {
    round2(weighted_mean(scores, weights))
}
