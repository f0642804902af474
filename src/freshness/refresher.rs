use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::error::{FreshnessError, FreshnessResult};
use crate::constants::{DEFAULT_ITEM_NAMESPACE, DEFAULT_QUERY_NAMESPACE};
use crate::entity::{Posting, Profile, posting_facet_texts, profile_facet_texts};
use crate::facet::Facet;
use crate::hashing::content_checksum;
use crate::store::QueueKind;
use crate::vectordb::{VectorIndex, VectorPoint};

/// Entity whose facet vectors are being rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshTarget {
    Profile(Profile),
    Posting(Posting),
}

impl RefreshTarget {
    pub fn id(&self) -> &str {
        match self {
            RefreshTarget::Profile(p) => &p.id,
            RefreshTarget::Posting(p) => &p.id,
        }
    }

    pub fn kind(&self) -> QueueKind {
        match self {
            RefreshTarget::Profile(_) => QueueKind::Query,
            RefreshTarget::Posting(_) => QueueKind::Item,
        }
    }

    pub fn stored_checksum(&self) -> Option<&str> {
        match self {
            RefreshTarget::Profile(p) => p.embedding_checksum.as_deref(),
            RefreshTarget::Posting(p) => p.embedding_checksum.as_deref(),
        }
    }

    /// Checksum of the entity's current text.
    pub fn current_checksum(&self) -> String {
        let document = match self {
            RefreshTarget::Profile(p) => p.search_document(),
            RefreshTarget::Posting(p) => p.search_document(),
        };
        content_checksum(&document)
    }

    pub fn is_unchanged(&self) -> bool {
        self.stored_checksum() == Some(self.current_checksum().as_str())
    }

    pub fn facet_texts(&self) -> Vec<(Facet, String)> {
        match self {
            RefreshTarget::Profile(p) => profile_facet_texts(p),
            RefreshTarget::Posting(p) => posting_facet_texts(p),
        }
    }
}

/// Turns facet texts into vectors.
#[async_trait]
pub trait FacetEmbedder: Send + Sync {
    /// One vector per input text, in order.
    async fn embed(&self, texts: &[String]) -> FreshnessResult<Vec<Vec<f32>>>;

    fn model_id(&self) -> &str;
}

/// Rebuilds the stored vectors of one entity.
#[async_trait]
pub trait VectorRefresher: Send + Sync {
    /// Returns the number of facet vectors written.
    async fn refresh(&self, target: &RefreshTarget) -> FreshnessResult<usize>;
}

/// [`VectorRefresher`] that embeds each non-empty facet and upserts it into the entity's
/// namespace as `"<id>:<facet>"`.
pub struct IndexRefresher<V> {
    index: Arc<V>,
    embedder: Arc<dyn FacetEmbedder>,
    query_namespace: String,
    item_namespace: String,
}

impl<V: VectorIndex> IndexRefresher<V> {
    pub fn new(index: Arc<V>, embedder: Arc<dyn FacetEmbedder>) -> Self {
        Self {
            index,
            embedder,
            query_namespace: DEFAULT_QUERY_NAMESPACE.to_string(),
            item_namespace: DEFAULT_ITEM_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespaces(mut self, query: impl Into<String>, item: impl Into<String>) -> Self {
        self.query_namespace = query.into();
        self.item_namespace = item.into();
        self
    }

    fn namespace(&self, kind: QueueKind) -> &str {
        match kind {
            QueueKind::Query => &self.query_namespace,
            QueueKind::Item => &self.item_namespace,
        }
    }
}

#[async_trait]
impl<V: VectorIndex> VectorRefresher for IndexRefresher<V> {
    async fn refresh(&self, target: &RefreshTarget) -> FreshnessResult<usize> {
        let (facets, texts): (Vec<Facet>, Vec<String>) = target.facet_texts().into_iter().unzip();
        let namespace = self.namespace(target.kind());

        // Facets that lost their text must not keep matching on the old vector.
        let emptied: Vec<String> = Facet::ALL
            .iter()
            .filter(|facet| !facets.contains(facet))
            .map(|facet| facet.vector_id(target.id()))
            .collect();
        if !emptied.is_empty() {
            self.index.delete(namespace, emptied).await?;
        }

        if texts.is_empty() {
            return Ok(0);
        }

        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(FreshnessError::EmbeddingCountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }

        let checksum = target.current_checksum();
        let points: Vec<VectorPoint> = facets
            .into_iter()
            .zip(vectors)
            .map(|(facet, vector)| {
                VectorPoint::for_facet(target.id(), facet, vector)
                    .with_metadata("entity_id", target.id())
                    .with_metadata("checksum", checksum.as_str())
                    .with_metadata("model", self.embedder.model_id())
            })
            .collect();
        let written = points.len();

        self.index.upsert(namespace, points).await?;
        debug!(
            entity_id = target.id(),
            namespace,
            facets = written,
            "Refreshed facet vectors"
        );

        Ok(written)
    }
}
