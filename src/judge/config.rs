use std::env;
use std::fmt;
use std::str::FromStr;

use crate::constants::DEFAULT_JUDGE_TOP_K;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_JUDGE_TEMPERATURE: f64 = 0.2;

/// Environment variables whose presence makes a provider usable.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Preferred chat provider. A preferred provider without a key falls back to any provider
/// that has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JudgeProvider {
    Gemini,
    OpenAi,
    #[default]
    Auto,
}

impl FromStr for JudgeProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(JudgeProvider::Gemini),
            "openai" => Ok(JudgeProvider::OpenAi),
            "auto" | "" => Ok(JudgeProvider::Auto),
            other => Err(format!("unknown judge provider: {}", other)),
        }
    }
}

impl fmt::Display for JudgeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JudgeProvider::Gemini => "gemini",
            JudgeProvider::OpenAi => "openai",
            JudgeProvider::Auto => "auto",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeConfig {
    pub enabled: bool,
    pub provider: JudgeProvider,
    pub gemini_model: String,
    pub openai_model: String,
    pub temperature: f64,
    /// How many of the best results are sent to the judge.
    pub top_k: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: JudgeProvider::Auto,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: DEFAULT_JUDGE_TEMPERATURE,
            top_k: DEFAULT_JUDGE_TOP_K,
        }
    }
}

impl JudgeConfig {
    const ENV_ENABLED: &'static str = "MATCHFUSE_JUDGE_ENABLED";
    const ENV_PROVIDER: &'static str = "MATCHFUSE_JUDGE_PROVIDER";
    const ENV_GEMINI_MODEL: &'static str = "MATCHFUSE_GEMINI_MODEL";
    const ENV_OPENAI_MODEL: &'static str = "MATCHFUSE_OPENAI_MODEL";
    const ENV_TEMPERATURE: &'static str = "MATCHFUSE_JUDGE_TEMPERATURE";
    const ENV_TOP_K: &'static str = "MATCHFUSE_JUDGE_TOP_K";

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: JudgeProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Model to use given which API keys are present, or `None` when no provider is usable.
    pub fn select_model(&self, has_gemini_key: bool, has_openai_key: bool) -> Option<&str> {
        match self.provider {
            JudgeProvider::Gemini if has_gemini_key => return Some(&self.gemini_model),
            JudgeProvider::OpenAi if has_openai_key => return Some(&self.openai_model),
            _ => {}
        }
        if has_gemini_key {
            Some(&self.gemini_model)
        } else if has_openai_key {
            Some(&self.openai_model)
        } else {
            None
        }
    }

    /// [`select_model`](Self::select_model) against the current environment.
    pub fn select_model_from_env(&self) -> Option<&str> {
        self.select_model(key_present(GEMINI_API_KEY_ENV), key_present(OPENAI_API_KEY_ENV))
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let enabled = env::var(Self::ENV_ENABLED)
            .ok()
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(defaults.enabled);

        let provider = env::var(Self::ENV_PROVIDER)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.provider);

        let gemini_model = non_empty_env(Self::ENV_GEMINI_MODEL).unwrap_or(defaults.gemini_model);
        let openai_model = non_empty_env(Self::ENV_OPENAI_MODEL).unwrap_or(defaults.openai_model);

        let temperature = env::var(Self::ENV_TEMPERATURE)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|t: &f64| t.is_finite() && *t >= 0.0)
            .unwrap_or(defaults.temperature);

        let top_k = env::var(Self::ENV_TOP_K)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.top_k);

        Self {
            enabled,
            provider,
            gemini_model,
            openai_model,
            temperature,
            top_k,
        }
    }
}

fn key_present(name: &str) -> bool {
    env::var(name).is_ok_and(|v| !v.trim().is_empty())
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
