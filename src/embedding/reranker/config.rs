use std::path::PathBuf;

use crate::constants::{DEFAULT_RERANK_ALPHA, DEFAULT_RERANK_TOP_K};

/// Reported model id when weights come from a local directory with no explicit id.
pub const DEFAULT_RERANKER_MODEL_ID: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

/// Model id reported by the lexical-overlap stub.
pub const STUB_MODEL_ID: &str = "lexical-overlap";

pub const MAX_SEQ_LEN: usize = 512;

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// Run the rerank stage at all.
    pub enabled: bool,

    /// Directory holding `config.json`, `model.safetensors` and `tokenizer.json`.
    /// `None` selects stub mode.
    pub model_path: Option<PathBuf>,

    pub model_id: String,

    /// Weight kept by the incoming score: `new = alpha * hybrid + (1 - alpha) * reranked`.
    pub alpha: f64,

    /// How many of the best hybrid results are reranked.
    pub top_k: usize,

    pub prefer_gpu: bool,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: None,
            model_id: DEFAULT_RERANKER_MODEL_ID.to_string(),
            alpha: DEFAULT_RERANK_ALPHA,
            top_k: DEFAULT_RERANK_TOP_K,
            prefer_gpu: true,
        }
    }
}

impl RerankerConfig {
    const ENV_ENABLED: &'static str = "MATCHFUSE_RERANKER_ENABLED";
    const ENV_PATH: &'static str = "MATCHFUSE_RERANKER_PATH";
    const ENV_MODEL_ID: &'static str = "MATCHFUSE_RERANKER_MODEL_ID";
    const ENV_ALPHA: &'static str = "MATCHFUSE_RERANK_ALPHA";
    const ENV_TOP_K: &'static str = "MATCHFUSE_RERANK_TOP_K";

    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Default::default()
        }
    }

    pub fn stub() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&alpha),
            "alpha must be between 0.0 and 1.0"
        );
        self.alpha = alpha;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(format!(
                "alpha must be between 0.0 and 1.0, got {}",
                self.alpha
            ));
        }

        if let Some(ref path) = self.model_path
            && path.as_os_str().is_empty()
        {
            return Err("model_path cannot be empty when provided".to_string());
        }

        Ok(())
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let enabled = std::env::var(Self::ENV_ENABLED)
            .ok()
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(defaults.enabled);

        let model_path = std::env::var(Self::ENV_PATH)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let model_id = std::env::var(Self::ENV_MODEL_ID)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.model_id);

        let alpha = std::env::var(Self::ENV_ALPHA)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|a: &f64| (0.0..=1.0).contains(a))
            .unwrap_or(defaults.alpha);

        let top_k = std::env::var(Self::ENV_TOP_K)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.top_k);

        Self {
            enabled,
            model_path,
            model_id,
            alpha,
            top_k,
            prefer_gpu: defaults.prefer_gpu,
        }
    }
}
