use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::facet::Facet;
use crate::vectordb::{SearchFilter, SearchResult, VectorDbError, VectorIndex, VectorPoint};

/// In-memory [`VectorIndex`] with failure injection.
///
/// Queries rank stored points by cosine similarity. Tests that need exact raw scores can
/// script the hits returned for a `(namespace, facet)` pair instead.
#[derive(Default)]
pub struct MockVectorIndex {
    namespaces: RwLock<HashMap<String, BTreeMap<String, MockStoredPoint>>>,
    scripted: RwLock<HashMap<(String, Facet), Vec<(String, f32)>>>,
    failing_facets: RwLock<HashSet<Facet>>,
    unavailable: AtomicBool,
    delay: RwLock<Option<Duration>>,
    query_count: AtomicUsize,
}

#[derive(Clone)]
struct MockStoredPoint {
    vector: Vec<f32>,
    metadata: BTreeMap<String, String>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map(|points| points.len())
            .unwrap_or(0)
    }

    /// Makes every operation fail as if the index were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes queries filtered to `facet` fail.
    pub fn fail_facet(&self, facet: Facet) {
        self.failing_facets.write().insert(facet);
    }

    /// Sleeps before answering each query.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Fixes the hits for queries against `namespace` filtered to `facet`.
    pub fn script_hits<I, S>(&self, namespace: &str, facet: Facet, hits: I)
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let hits = hits.into_iter().map(|(id, s)| (id.into(), s)).collect();
        self.scripted
            .write()
            .insert((namespace.to_string(), facet), hits);
    }

    /// Number of `query` calls served (including failed ones).
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    fn check_available(&self, namespace: &str) -> Result<(), VectorDbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VectorDbError::ConnectionFailed {
                url: format!("mock://{}", namespace),
                message: "index unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for MockVectorIndex {
    async fn upsert(&self, namespace: &str, points: Vec<VectorPoint>) -> Result<(), VectorDbError> {
        self.check_available(namespace)?;

        let mut namespaces = self.namespaces.write();
        let stored = namespaces.entry(namespace.to_string()).or_default();

        if let Some(expected) = stored.values().next().map(|p| p.vector.len()) {
            if let Some(bad) = points.iter().find(|p| p.vector.len() != expected) {
                return Err(VectorDbError::InvalidDimension {
                    expected,
                    actual: bad.vector.len(),
                });
            }
        }

        for point in points {
            let mut metadata = point.metadata;
            if let Some((_, facet)) = Facet::parse_vector_id(&point.id) {
                metadata
                    .entry(super::FACET_FIELD.to_string())
                    .or_insert_with(|| facet.as_str().to_string());
            }
            stored.insert(
                point.id,
                MockStoredPoint {
                    vector: point.vector,
                    metadata,
                },
            );
        }

        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        filter: SearchFilter,
        top_k: u64,
    ) -> Result<Vec<SearchResult>, VectorDbError> {
        self.query_count.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_available(namespace)?;
        if let Some(facet) = filter.facet {
            if self.failing_facets.read().contains(&facet) {
                return Err(VectorDbError::QueryFailed {
                    namespace: namespace.to_string(),
                    message: format!("injected failure for facet {}", facet),
                });
            }

            let scripted = self
                .scripted
                .read()
                .get(&(namespace.to_string(), facet))
                .cloned();
            if let Some(hits) = scripted {
                return Ok(hits
                    .into_iter()
                    .take(top_k as usize)
                    .map(|(id, score)| SearchResult {
                        id,
                        score,
                        metadata: BTreeMap::from([(
                            super::FACET_FIELD.to_string(),
                            facet.as_str().to_string(),
                        )]),
                    })
                    .collect());
            }
        }

        let namespaces = self.namespaces.read();
        let Some(stored) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<SearchResult> = stored
            .iter()
            .filter(|(_, p)| filter.accepts(&p.metadata))
            .map(|(id, p)| SearchResult {
                id: id.clone(),
                score: cosine_similarity(&vector, &p.vector),
                metadata: p.metadata.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k as usize);

        Ok(results)
    }

    async fn delete(&self, namespace: &str, ids: Vec<String>) -> Result<(), VectorDbError> {
        self.check_available(namespace)?;

        if let Some(stored) = self.namespaces.write().get_mut(namespace) {
            for id in &ids {
                stored.remove(id);
            }
        }
        Ok(())
    }

    async fn fetch(
        &self,
        namespace: &str,
        ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<f32>>, VectorDbError> {
        self.check_available(namespace)?;

        let namespaces = self.namespaces.read();
        let Some(stored) = namespaces.get(namespace) else {
            return Ok(HashMap::new());
        };

        Ok(ids
            .into_iter()
            .filter_map(|id| stored.get(&id).map(|p| (id, p.vector.clone())))
            .collect())
    }
}

/// Cosine similarity; 0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}
