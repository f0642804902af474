use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("store returned status {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode store response: {reason}")]
    Decode { reason: String },

    #[error("queue entry not found: {id}")]
    EntryNotFound { id: String },

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("invalid store configuration: {reason}")]
    InvalidConfig { reason: String },
}
