//! Environment-backed infrastructure configuration.
//!
//! Endpoints and credentials for the collaborators the CLI wires together. Pipeline tunables
//! live in [`EngineConfig`](crate::ranking::EngineConfig). Override with `MATCHFUSE_*`
//! environment variables; the relational store also honours `SUPABASE_URL` and
//! `SUPABASE_SERVICE_ROLE_KEY`.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Connection settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// PostgREST root URL (e.g. `https://project.supabase.co/rest/v1`).
    pub postgrest_url: Option<String>,

    /// PostgREST API key, sent as `apikey` and bearer token.
    pub postgrest_key: Option<String>,

    /// Path to the reranker model directory (BERT + tokenizer). `None` selects stub mode.
    pub reranker_path: Option<PathBuf>,

    /// Max profiles/postings held by the read-through cache. Default: `10_000`.
    pub cache_capacity: u64,

    /// Cached row lifetime. Default: 60 s.
    pub cache_ttl: Duration,
}

/// Default Qdrant URL used when `MATCHFUSE_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            postgrest_url: None,
            postgrest_key: None,
            reranker_path: None,
            cache_capacity: 10_000,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

impl Config {
    const ENV_QDRANT_URL: &'static str = "MATCHFUSE_QDRANT_URL";
    const ENV_POSTGREST_URL: &'static str = "MATCHFUSE_POSTGREST_URL";
    const ENV_POSTGREST_KEY: &'static str = "MATCHFUSE_POSTGREST_KEY";
    const ENV_SUPABASE_URL: &'static str = "SUPABASE_URL";
    const ENV_SUPABASE_KEY: &'static str = "SUPABASE_SERVICE_ROLE_KEY";
    const ENV_RERANKER_PATH: &'static str = "MATCHFUSE_RERANKER_PATH";
    const ENV_CACHE_CAPACITY: &'static str = "MATCHFUSE_CACHE_CAPACITY";
    const ENV_CACHE_TTL_SECS: &'static str = "MATCHFUSE_CACHE_TTL_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL)
            .unwrap_or(defaults.qdrant_url);
        let postgrest_url = Self::parse_string_from_env(Self::ENV_POSTGREST_URL).or_else(|| {
            Self::parse_string_from_env(Self::ENV_SUPABASE_URL)
                .map(|base| format!("{}/rest/v1", base.trim_end_matches('/')))
        });
        let postgrest_key = Self::parse_string_from_env(Self::ENV_POSTGREST_KEY)
            .or_else(|| Self::parse_string_from_env(Self::ENV_SUPABASE_KEY));
        let reranker_path =
            Self::parse_string_from_env(Self::ENV_RERANKER_PATH).map(PathBuf::from);
        let cache_capacity =
            Self::parse_u64_from_env(Self::ENV_CACHE_CAPACITY)?.unwrap_or(defaults.cache_capacity);
        let cache_ttl = Self::parse_u64_from_env(Self::ENV_CACHE_TTL_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        Ok(Self {
            qdrant_url,
            postgrest_url,
            postgrest_key,
            reranker_path,
            cache_capacity,
            cache_ttl,
        })
    }

    /// Validates URLs and paths (does not contact any service).
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_url(Self::ENV_QDRANT_URL, &self.qdrant_url)?;

        if let Some(ref url) = self.postgrest_url {
            Self::validate_url(Self::ENV_POSTGREST_URL, url)?;
            if self.postgrest_key.is_none() {
                return Err(ConfigError::MissingEnvVar {
                    name: Self::ENV_POSTGREST_KEY,
                });
            }
        }

        if let Some(ref path) = self.reranker_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_CACHE_CAPACITY,
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    /// PostgREST URL and key, or an error naming the missing variable.
    pub fn postgrest(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .postgrest_url
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_POSTGREST_URL,
            })?;
        let key = self
            .postgrest_key
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_POSTGREST_KEY,
            })?;
        Ok((url, key))
    }

    fn validate_url(name: &'static str, url: &str) -> Result<(), ConfigError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(())
        } else {
            Err(ConfigError::InvalidUrl {
                name,
                value: url.to_string(),
            })
        }
    }

    fn parse_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &'static str) -> Result<Option<u64>, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::ParseError {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(None),
        }
    }
}
