use qdrant_client::Qdrant;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    Condition, DeletePointsBuilder, Filter, GetPointsBuilder, PointId, PointStruct,
    PointsIdsList, SearchPointsBuilder, UpsertPointsBuilder, VectorsOutput,
};
use std::collections::HashMap;
use tracing::debug;

use super::error::VectorDbError;
use super::model::{SearchFilter, SearchResult, VectorPoint};
use super::{FACET_FIELD, POINT_KEY_FIELD, WriteConsistency};
use crate::hashing::point_id;

#[derive(Clone)]
/// Qdrant-backed [`VectorIndex`]. Each namespace is a collection.
///
/// Qdrant only accepts numeric or UUID point ids, so the string id is hashed with
/// [`point_id`] and kept verbatim in the `point_key` payload field.
pub struct QdrantIndex {
    client: Qdrant,
    url: String,
    consistency: WriteConsistency,
}

impl QdrantIndex {
    /// Creates a client for `url`.
    pub async fn new(url: &str) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
            consistency: WriteConsistency::Strong,
        })
    }

    pub fn with_consistency(mut self, consistency: WriteConsistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn upsert_points(
        &self,
        namespace: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorDbError> {
        if points.is_empty() {
            return Ok(());
        }

        let qdrant_points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert(POINT_KEY_FIELD.to_string(), p.id.clone().into());
                if let Some(facet) = p.facet() {
                    payload.insert(FACET_FIELD.to_string(), facet.as_str().into());
                }
                for (key, value) in p.metadata {
                    payload.entry(key).or_insert_with(|| value.into());
                }

                PointStruct::new(point_id(namespace, &p.id), p.vector, payload)
            })
            .collect();

        self.client
            .upsert_points(
                UpsertPointsBuilder::new(namespace, qdrant_points).wait(self.consistency.into()),
            )
            .await
            .map_err(|e| VectorDbError::UpsertFailed {
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn search(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        filter: SearchFilter,
        top_k: u64,
    ) -> Result<Vec<SearchResult>, VectorDbError> {
        let mut search_builder =
            SearchPointsBuilder::new(namespace, vector, top_k).with_payload(true);

        if let Some(facet) = filter.facet {
            search_builder = search_builder.filter(Filter::must([Condition::matches(
                FACET_FIELD,
                facet.as_str().to_string(),
            )]));
        }

        let response = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorDbError::QueryFailed {
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        let results: Vec<SearchResult> = response
            .result
            .into_iter()
            .filter_map(SearchResult::from_scored_point)
            .collect();

        debug!(namespace, hits = results.len(), "Qdrant query complete");
        Ok(results)
    }

    async fn delete_points(&self, namespace: &str, ids: Vec<String>) -> Result<(), VectorDbError> {
        if ids.is_empty() {
            return Ok(());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| point_id(namespace, id).into()).collect();
        self.client
            .delete_points(
                DeletePointsBuilder::new(namespace)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(self.consistency.into()),
            )
            .await
            .map_err(|e| VectorDbError::DeleteFailed {
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        debug!(namespace, count = ids.len(), "Qdrant delete complete");
        Ok(())
    }

    async fn fetch_points(
        &self,
        namespace: &str,
        ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<f32>>, VectorDbError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| point_id(namespace, id).into()).collect();

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(namespace, point_ids)
                    .with_vectors(true)
                    .with_payload(true),
            )
            .await
            .map_err(|e| VectorDbError::FetchFailed {
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        let mut out = HashMap::new();
        for point in response.result {
            let Some(key) = point
                .payload
                .get(POINT_KEY_FIELD)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
            else {
                continue;
            };
            // Hash collisions resolve to a different key; only keep what was asked for.
            if !ids.contains(&key) {
                continue;
            }
            if let Some(vector) = point.vectors.and_then(dense_vector) {
                if !vector.is_empty() {
                    out.insert(key, vector);
                }
            }
        }

        Ok(out)
    }
}

#[allow(deprecated)]
fn dense_vector(vectors: VectorsOutput) -> Option<Vec<f32>> {
    match vectors.vectors_options? {
        VectorsOptions::Vector(vector) => Some(vector.data),
        _ => None,
    }
}

/// Minimal async interface the ranking engine needs from a vector index.
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces points by id.
    fn upsert(
        &self,
        namespace: &str,
        points: Vec<VectorPoint>,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Nearest neighbours of `vector`, best first.
    fn query(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        filter: SearchFilter,
        top_k: u64,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, VectorDbError>> + Send;

    /// Removes points by id. Unknown ids are ignored.
    fn delete(
        &self,
        namespace: &str,
        ids: Vec<String>,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Vectors for the ids that exist; missing ids are simply absent from the map.
    fn fetch(
        &self,
        namespace: &str,
        ids: Vec<String>,
    ) -> impl std::future::Future<Output = Result<HashMap<String, Vec<f32>>, VectorDbError>> + Send;
}

impl VectorIndex for QdrantIndex {
    async fn upsert(&self, namespace: &str, points: Vec<VectorPoint>) -> Result<(), VectorDbError> {
        self.upsert_points(namespace, points).await
    }

    async fn query(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        filter: SearchFilter,
        top_k: u64,
    ) -> Result<Vec<SearchResult>, VectorDbError> {
        self.search(namespace, vector, filter, top_k).await
    }

    async fn delete(&self, namespace: &str, ids: Vec<String>) -> Result<(), VectorDbError> {
        self.delete_points(namespace, ids).await
    }

    async fn fetch(
        &self,
        namespace: &str,
        ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<f32>>, VectorDbError> {
        self.fetch_points(namespace, ids).await
    }
}
