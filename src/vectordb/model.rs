use qdrant_client::qdrant::ScoredPoint;
use std::collections::BTreeMap;

use super::{FACET_FIELD, POINT_KEY_FIELD};
use crate::facet::Facet;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    /// `"<entity_id>:<facet>"`.
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

impl VectorPoint {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: BTreeMap::new(),
        }
    }

    /// Point for `entity_id`'s `facet`, tagged with the facet so filtered queries can find it.
    pub fn for_facet(entity_id: &str, facet: Facet, vector: Vec<f32>) -> Self {
        Self::new(facet.vector_id(entity_id), vector).with_metadata(FACET_FIELD, facet.as_str())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn facet(&self) -> Option<Facet> {
        self.metadata
            .get(FACET_FIELD)
            .and_then(|f| f.parse().ok())
            .or_else(|| Facet::parse_vector_id(&self.id).map(|(_, f)| f))
    }
}

/// Restriction applied to a similarity query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub facet: Option<Facet>,
}

impl SearchFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn facet(facet: Facet) -> Self {
        Self { facet: Some(facet) }
    }

    pub fn accepts(&self, metadata: &BTreeMap<String, String>) -> bool {
        match self.facet {
            None => true,
            Some(facet) => metadata
                .get(FACET_FIELD)
                .is_some_and(|f| f == facet.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// `"<entity_id>:<facet>"`.
    pub id: String,
    /// Raw similarity as reported by the index.
    pub score: f32,
    pub metadata: BTreeMap<String, String>,
}

impl SearchResult {
    pub fn from_scored_point(point: ScoredPoint) -> Option<Self> {
        let payload = point.payload;

        let id = payload
            .get(POINT_KEY_FIELD)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())?;

        let metadata = payload
            .iter()
            .filter(|(k, _)| k.as_str() != POINT_KEY_FIELD)
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        Some(SearchResult {
            id,
            score: point.score,
            metadata,
        })
    }
}
