use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("no judge provider configured: {reason}")]
    NotConfigured { reason: String },

    #[error("judge provider '{model}' request failed: {message}")]
    Provider { model: String, message: String },

    #[error("judge returned no text")]
    EmptyResponse,

    #[error("judge output malformed: {reason}")]
    MalformedOutput { reason: String },

    #[error("failed to encode judge request: {0}")]
    Encode(#[from] serde_json::Error),
}
