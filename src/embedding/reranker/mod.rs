pub mod config;
pub mod error;


pub use config::{DEFAULT_RERANKER_MODEL_ID, MAX_SEQ_LEN, RerankerConfig, STUB_MODEL_ID};
pub use error::RerankerError;

use crate::embedding::bert::BertClassifier;
use candle_core::Tensor;
use std::collections::HashSet;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::embedding::device::select_device;
use crate::embedding::utils::load_pair_tokenizer;

/// Scores `(query, candidate)` text pairs. Higher is more relevant; the scale is
/// model-specific, callers normalize per batch.
///
/// Implementations are CPU bound; async callers run them on a blocking thread.
pub trait PairwiseScorer: Send + Sync {
    fn predict(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, RerankerError>;

    /// Identifier recorded alongside persisted scores.
    fn model_id(&self) -> &str;
}

pub struct Reranker {
    device: candle_core::Device,
    config: RerankerConfig,
    model: Option<BertClassifier>,
    tokenizer: Option<Tokenizer>,
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("device", &format!("{:?}", self.device))
            .field("config", &self.config)
            .field("model_loaded", &self.is_model_loaded())
            .finish()
    }
}

impl Reranker {
    pub fn load(config: RerankerConfig) -> Result<Self, RerankerError> {
        if let Err(msg) = config.validate() {
            return Err(RerankerError::InvalidConfig { reason: msg });
        }

        let Some(model_path) = config.model_path.clone() else {
            info!("No reranker model path configured, operating in stub mode");
            return Ok(Self {
                device: candle_core::Device::Cpu,
                config,
                model: None,
                tokenizer: None,
            });
        };

        for required in ["config.json", "model.safetensors"] {
            if !model_path.join(required).exists() {
                return Err(RerankerError::ModelLoadFailed {
                    reason: format!("Missing {} in {}", required, model_path.display()),
                });
            }
        }

        let device = select_device(config.prefer_gpu)?;
        debug!(?device, "Selected compute device for reranker");

        info!(
            model_path = %model_path.display(),
            model_id = %config.model_id,
            "Loading reranker model"
        );

        let model = BertClassifier::load(&model_path, &device).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load BERT model: {}", e),
            }
        })?;

        let tokenizer = load_pair_tokenizer(&model_path, MAX_SEQ_LEN).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            }
        })?;

        info!(model_id = %config.model_id, "Reranker model loaded successfully");

        Ok(Self {
            device,
            config,
            model: Some(model),
            tokenizer: Some(tokenizer),
        })
    }

    pub fn stub() -> Result<Self, RerankerError> {
        Self::load(RerankerConfig::stub())
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    pub fn device(&self) -> &candle_core::Device {
        &self.device
    }

    fn predict_with_model(
        &self,
        model: &BertClassifier,
        tokenizer: &Tokenizer,
        pairs: &[(String, String)],
    ) -> Result<Vec<f32>, RerankerError> {
        let inputs: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(q, c)| (q.as_str(), c.as_str()))
            .collect();

        let encodings =
            tokenizer
                .encode_batch(inputs, true)
                .map_err(|e| RerankerError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let rows = encodings.len();
        let width = encodings.first().map(|e| e.len()).unwrap_or(0);
        let mut ids = Vec::with_capacity(rows * width);
        let mut type_ids = Vec::with_capacity(rows * width);
        let mut mask = Vec::with_capacity(rows * width);
        for encoding in &encodings {
            ids.extend_from_slice(encoding.get_ids());
            type_ids.extend_from_slice(encoding.get_type_ids());
            mask.extend_from_slice(encoding.get_attention_mask());
        }

        let ids = Tensor::from_vec(ids, (rows, width), &self.device)?;
        let type_ids = Tensor::from_vec(type_ids, (rows, width), &self.device)?;
        let mask = Tensor::from_vec(mask, (rows, width), &self.device)?;

        let scores = model.score_batch(&ids, &type_ids, &mask)?;
        if scores.len() != pairs.len() {
            return Err(RerankerError::ScoreCountMismatch {
                expected: pairs.len(),
                actual: scores.len(),
            });
        }
        Ok(scores)
    }
}

impl PairwiseScorer for Reranker {
    fn predict(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, RerankerError> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            pairs = pairs.len(),
            model_loaded = self.is_model_loaded(),
            "Scoring text pairs"
        );

        if let (Some(model), Some(tokenizer)) = (&self.model, &self.tokenizer) {
            return self.predict_with_model(model, tokenizer, pairs);
        }

        Ok(pairs
            .iter()
            .map(|(query, candidate)| lexical_overlap_score(query, candidate))
            .collect())
    }

    fn model_id(&self) -> &str {
        if self.is_model_loaded() {
            &self.config.model_id
        } else {
            STUB_MODEL_ID
        }
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "to", "of",
    "in", "for", "on", "with", "at", "by", "from", "as", "into", "and", "but", "if", "or",
    "not", "no", "so", "than", "too", "very", "this", "that", "these", "those", "it", "its",
    "name", "skills", "experience", "education", "licenses", "certs", "required", "req",
];

/// Stub relevance in `[0, 1]`: recall of query words (blended with Jaccard) through a sigmoid.
fn lexical_overlap_score(query: &str, candidate: &str) -> f32 {
    fn words(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
            .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
            .map(str::to_string)
            .collect()
    }

    let query_words = words(query);
    let candidate_words = words(candidate);

    if query_words.is_empty() {
        return 0.0;
    }

    let matches = query_words.intersection(&candidate_words).count();
    let recall = matches as f32 / query_words.len() as f32;
    let union = query_words.union(&candidate_words).count();
    let jaccard = if union > 0 {
        matches as f32 / union as f32
    } else {
        0.0
    };

    let base_score = 0.6 * recall + 0.4 * jaccard;
    (1.0 / (1.0 + (-8.0 * (base_score - 0.5)).exp())).clamp(0.0, 1.0)
}
