use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ITEM_NAMESPACE, DEFAULT_MAX_CONCURRENT_CALLS, DEFAULT_QUERY_NAMESPACE,
    DEFAULT_STALE_ITEM_LIMIT,
};
use crate::embedding::RerankerConfig;
use crate::judge::JudgeConfig;
use crate::scoring::{CalibrationConfig, FusionConfig, PenaltyConfig};

/// Per-stage time limits. Each is further bounded by the caller's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub vector: Duration,
    pub reranker: Duration,
    pub judge: Duration,
    pub store: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            vector: Duration::from_secs(5),
            reranker: Duration::from_secs(10),
            judge: Duration::from_secs(30),
            store: Duration::from_secs(5),
        }
    }
}

impl StageTimeouts {
    const ENV_VECTOR_MS: &'static str = "MATCHFUSE_VECTOR_TIMEOUT_MS";
    const ENV_RERANKER_MS: &'static str = "MATCHFUSE_RERANKER_TIMEOUT_MS";
    const ENV_JUDGE_MS: &'static str = "MATCHFUSE_JUDGE_TIMEOUT_MS";
    const ENV_STORE_MS: &'static str = "MATCHFUSE_STORE_TIMEOUT_MS";

    /// The same limit for every stage.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            vector: timeout,
            reranker: timeout,
            judge: timeout,
            store: timeout,
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            vector: env_millis(Self::ENV_VECTOR_MS).unwrap_or(defaults.vector),
            reranker: env_millis(Self::ENV_RERANKER_MS).unwrap_or(defaults.reranker),
            judge: env_millis(Self::ENV_JUDGE_MS).unwrap_or(defaults.judge),
            store: env_millis(Self::ENV_STORE_MS).unwrap_or(defaults.store),
        }
    }
}

/// Every tunable of the ranking pipeline, passed to the orchestrator at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub calibration: CalibrationConfig,
    /// Rerank subset size and blend alpha; `enabled` gates the stage.
    pub reranker: RerankerConfig,
    pub fusion: FusionConfig,
    /// Judge subset size; `enabled` gates the stage.
    pub judge: JudgeConfig,
    pub penalty: PenaltyConfig,
    pub timeouts: StageTimeouts,
    /// Upper bound on in-flight collaborator calls across a ranking call.
    pub max_concurrent_calls: usize,
    pub persist_snapshots: bool,
    /// Enqueue postings without vectors before each ranking call.
    pub auto_enqueue_stale_items: bool,
    pub stale_item_limit: usize,
    pub query_namespace: String,
    pub item_namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationConfig::default(),
            reranker: RerankerConfig::default(),
            fusion: FusionConfig::default(),
            judge: JudgeConfig::default(),
            penalty: PenaltyConfig::default(),
            timeouts: StageTimeouts::default(),
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            persist_snapshots: true,
            auto_enqueue_stale_items: false,
            stale_item_limit: DEFAULT_STALE_ITEM_LIMIT,
            query_namespace: DEFAULT_QUERY_NAMESPACE.to_string(),
            item_namespace: DEFAULT_ITEM_NAMESPACE.to_string(),
        }
    }
}

impl EngineConfig {
    const ENV_MAX_CONCURRENT_CALLS: &'static str = "MATCHFUSE_MAX_CONCURRENT_CALLS";
    const ENV_PERSIST_SNAPSHOTS: &'static str = "MATCHFUSE_PERSIST_SNAPSHOTS";
    const ENV_AUTO_ENQUEUE_STALE: &'static str = "MATCHFUSE_AUTO_ENQUEUE_STALE_ITEMS";
    const ENV_STALE_ITEM_LIMIT: &'static str = "MATCHFUSE_STALE_ITEM_LIMIT";
    const ENV_QUERY_NAMESPACE: &'static str = "MATCHFUSE_QUERY_NAMESPACE";
    const ENV_ITEM_NAMESPACE: &'static str = "MATCHFUSE_ITEM_NAMESPACE";

    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            calibration: defaults.calibration,
            reranker: RerankerConfig::from_env(),
            fusion: defaults.fusion,
            judge: JudgeConfig::from_env(),
            penalty: defaults.penalty,
            timeouts: StageTimeouts::from_env(),
            max_concurrent_calls: env::var(Self::ENV_MAX_CONCURRENT_CALLS)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent_calls),
            persist_snapshots: env_flag(Self::ENV_PERSIST_SNAPSHOTS)
                .unwrap_or(defaults.persist_snapshots),
            auto_enqueue_stale_items: env_flag(Self::ENV_AUTO_ENQUEUE_STALE)
                .unwrap_or(defaults.auto_enqueue_stale_items),
            stale_item_limit: env::var(Self::ENV_STALE_ITEM_LIMIT)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.stale_item_limit),
            query_namespace: non_empty_env(Self::ENV_QUERY_NAMESPACE)
                .unwrap_or(defaults.query_namespace),
            item_namespace: non_empty_env(Self::ENV_ITEM_NAMESPACE)
                .unwrap_or(defaults.item_namespace),
        }
    }

    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_reranker(mut self, reranker: RerankerConfig) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn with_judge(mut self, judge: JudgeConfig) -> Self {
        self.judge = judge;
        self
    }

    pub fn with_penalty(mut self, penalty: PenaltyConfig) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_max_concurrent_calls(mut self, max: usize) -> Self {
        assert!(max > 0, "max_concurrent_calls must be positive");
        self.max_concurrent_calls = max;
        self
    }

    pub fn with_persist_snapshots(mut self, persist: bool) -> Self {
        self.persist_snapshots = persist;
        self
    }

    pub fn with_auto_enqueue_stale_items(mut self, enabled: bool) -> Self {
        self.auto_enqueue_stale_items = enabled;
        self
    }

    pub fn with_stale_item_limit(mut self, limit: usize) -> Self {
        self.stale_item_limit = limit;
        self
    }

    pub fn with_namespaces(mut self, query: impl Into<String>, item: impl Into<String>) -> Self {
        self.query_namespace = query.into();
        self.item_namespace = item.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        self.reranker.validate()?;
        if self.max_concurrent_calls == 0 {
            return Err("max_concurrent_calls must be positive".to_string());
        }
        if self.query_namespace.trim().is_empty() || self.item_namespace.trim().is_empty() {
            return Err("vector namespaces cannot be empty".to_string());
        }
        Ok(())
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| {
        !matches!(
            v.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        )
    })
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
