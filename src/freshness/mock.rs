use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::error::{FreshnessError, FreshnessResult};
use super::refresher::FacetEmbedder;
use crate::hashing::hash_to_u64;

pub const MOCK_EMBEDDING_DIM: usize = 16;

/// Deterministic bag-of-words embedder.
///
/// Each lowercase token increments one of [`MOCK_EMBEDDING_DIM`] buckets chosen by hash; the
/// result is L2-normalized, so texts sharing tokens have positive cosine similarity.
#[derive(Default)]
pub struct MockEmbedder {
    failing: AtomicBool,
    calls: AtomicUsize,
    fail_on: Mutex<Option<String>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fails any batch containing a text with this substring.
    pub fn fail_on(&self, needle: impl Into<String>) {
        *self.fail_on.lock() = Some(needle.into());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; MOCK_EMBEDDING_DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = hash_to_u64(token.to_lowercase().as_bytes()) as usize % MOCK_EMBEDDING_DIM;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl FacetEmbedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> FreshnessResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FreshnessError::Embedding {
                reason: "mock embedder failing".to_string(),
            });
        }
        if let Some(needle) = self.fail_on.lock().as_deref()
            && texts.iter().any(|t| t.contains(needle))
        {
            return Err(FreshnessError::Embedding {
                reason: format!("mock embedder rejects text containing {:?}", needle),
            });
        }
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }

    fn model_id(&self) -> &str {
        "mock-embedder"
    }
}
