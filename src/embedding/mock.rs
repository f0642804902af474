use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::reranker::{PairwiseScorer, RerankerError};

/// Scripted [`PairwiseScorer`].
///
/// Scores are looked up by candidate text substring; unmatched pairs get `default_score`.
pub struct MockScorer {
    model_id: String,
    by_candidate: Mutex<Vec<(String, f32)>>,
    default_score: f32,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl Default for MockScorer {
    fn default() -> Self {
        Self {
            model_id: "mock-cross-encoder".to_string(),
            by_candidate: Mutex::new(Vec::new()),
            default_score: 0.0,
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }
}

impl MockScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs whose candidate text contains `needle` score `score`.
    pub fn with_score(self, needle: impl Into<String>, score: f32) -> Self {
        self.by_candidate.lock().push((needle.into(), score));
        self
    }

    pub fn with_scores(self, scores: HashMap<String, f32>) -> Self {
        self.by_candidate.lock().extend(scores);
        self
    }

    pub fn with_default_score(mut self, score: f32) -> Self {
        self.default_score = score;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Blocks the calling thread before scoring.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PairwiseScorer for MockScorer {
    fn predict(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, RerankerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(RerankerError::NotAvailable {
                reason: "mock scorer set to fail".to_string(),
            });
        }

        let table = self.by_candidate.lock();
        Ok(pairs
            .iter()
            .map(|(_, candidate)| {
                table
                    .iter()
                    .find(|(needle, _)| candidate.contains(needle.as_str()))
                    .map(|(_, score)| *score)
                    .unwrap_or(self.default_score)
            })
            .collect())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
