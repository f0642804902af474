//! PostgREST-backed store.
//!
//! Reads `job_seeker` / `job_post`, appends to `job_match_scores`, and drives the
//! `embedding_queue` / `embedding_queue_post` tables. Claims go through the
//! `claim_embedding_queue` RPC, which leases rows with `FOR UPDATE SKIP LOCKED`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::error::StoreError;
use super::rows::{
    POSTING_ID_COLUMN, POSTING_TABLE, SEEKER_ID_COLUMN, SEEKER_TABLE, SNAPSHOT_TABLE,
    entity_id_column, entity_table, posting_from_row, profile_from_row, queue_entry_from_row,
    queue_insert_row, queue_table, snapshot_row,
};
use super::types::{QueueEntry, QueueKind, QueueReason, ScoreSnapshot};
use super::{EntityStore, FreshnessQueue, SnapshotLog};
use crate::entity::{Posting, Profile};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Ids per `in.(...)` filter; keeps the query string bounded.
const IN_FILTER_CHUNK: usize = 200;
const CLAIM_RPC: &str = "rpc/claim_embedding_queue";

#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// PostgREST root, e.g. `https://project.supabase.co/rest/v1`.
    pub base_url: String,
    /// Sent as both `apikey` and bearer token.
    pub api_key: String,
    pub timeout: Duration,
}

impl PostgrestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct PostgrestStore {
    http: HttpClient,
    base_url: String,
}

impl PostgrestStore {
    pub fn new(config: PostgrestConfig) -> Result<Self, StoreError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StoreError::InvalidConfig {
                reason: "PostgREST base URL is empty".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|e| StoreError::InvalidConfig {
            reason: format!("API key is not a valid header value: {}", e),
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|e| {
            StoreError::InvalidConfig {
                reason: format!("API key is not a valid header value: {}", e),
            }
        })?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::InvalidConfig {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, url: String, builder: RequestBuilder) -> Result<Response, StoreError> {
        let resp = builder.send().await.map_err(|source| StoreError::Http {
            url: url.clone(),
            source,
        })?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(StoreError::Status { url, status, body })
        }
    }

    async fn rows(&self, url: String, builder: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let resp = self.send(url, builder).await?;
        let body: Value = resp.json().await.map_err(|e| StoreError::Decode {
            reason: e.to_string(),
        })?;
        match body {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    async fn select(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<Value>, StoreError> {
        let url = self.url(table);
        let builder = self.http.get(&url).query(query);
        self.rows(url, builder).await
    }
}

/// PostgREST `in.(...)` filter with each id double-quoted.
pub fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('"', "")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl EntityStore for PostgrestStore {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let rows = self
            .select(
                SEEKER_TABLE,
                &[
                    ("select", "*".to_string()),
                    (SEEKER_ID_COLUMN, format!("eq.{}", id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.first().and_then(profile_from_row))
    }

    async fn profile_id_by_lookup_key(&self, key: &str) -> Result<Option<String>, StoreError> {
        let rows = self
            .select(
                SEEKER_TABLE,
                &[
                    ("select", SEEKER_ID_COLUMN.to_string()),
                    ("email", format!("eq.{}", key.trim())),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get(SEEKER_ID_COLUMN))
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }))
    }

    async fn postings(&self, ids: &[String]) -> Result<Vec<Posting>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_FILTER_CHUNK) {
            let rows = self
                .select(
                    POSTING_TABLE,
                    &[
                        ("select", "*".to_string()),
                        (POSTING_ID_COLUMN, in_filter(chunk)),
                    ],
                )
                .await?;
            out.extend(rows.iter().filter_map(posting_from_row));
        }
        debug!(requested = ids.len(), loaded = out.len(), "Loaded postings");
        Ok(out)
    }

    async fn stale_postings(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let rows = self
            .select(
                POSTING_TABLE,
                &[
                    ("select", POSTING_ID_COLUMN.to_string()),
                    (
                        "or",
                        "(pinecone_id.is.null,embedding_checksum.is.null)".to_string(),
                    ),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(POSTING_ID_COLUMN))
            .filter_map(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl SnapshotLog for PostgrestStore {
    async fn append(&self, snapshots: Vec<ScoreSnapshot>) -> Result<(), StoreError> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let rows: Vec<Value> = snapshots.iter().map(snapshot_row).collect();
        let url = self.url(SNAPSHOT_TABLE);
        let builder = self
            .http
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(&rows);
        self.send(url, builder).await?;
        Ok(())
    }
}

#[async_trait]
impl FreshnessQueue for PostgrestStore {
    async fn enqueue(
        &self,
        kind: QueueKind,
        entity_id: &str,
        reason: QueueReason,
    ) -> Result<QueueEntry, StoreError> {
        let table = queue_table(kind);
        let pending = self
            .select(
                table,
                &[
                    ("select", "*".to_string()),
                    (entity_id_column(kind), format!("eq.{}", entity_id)),
                    ("processed_at", "is.null".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        if let Some(row) = pending.first() {
            return queue_entry_from_row(kind, row);
        }

        let url = self.url(table);
        let builder = self
            .http
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&queue_insert_row(kind, entity_id, reason));
        let rows = self.rows(url, builder).await?;
        let row = rows.first().ok_or_else(|| StoreError::Decode {
            reason: format!("insert into {} returned no row", table),
        })?;
        queue_entry_from_row(kind, row)
    }

    async fn claim(
        &self,
        kind: QueueKind,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<QueueEntry>, StoreError> {
        let url = self.url(CLAIM_RPC);
        let builder = self.http.post(&url).json(&json!({
            "p_table": queue_table(kind),
            "p_limit": limit,
            "p_lease_seconds": lease.as_secs().max(1),
        }));
        let rows = self.rows(url, builder).await?;
        rows.iter()
            .map(|row| queue_entry_from_row(kind, row))
            .collect()
    }

    async fn complete(&self, entry: &QueueEntry) -> Result<(), StoreError> {
        let url = self.url(queue_table(entry.kind));
        let builder = self
            .http
            .patch(&url)
            .query(&[("id", format!("eq.{}", entry.id))])
            .json(&json!({ "processed_at": Utc::now().to_rfc3339() }));
        self.send(url, builder).await?;
        Ok(())
    }

    async fn record_checksum(
        &self,
        kind: QueueKind,
        entity_id: &str,
        checksum: &str,
    ) -> Result<(), StoreError> {
        let id_column = entity_id_column(kind);
        let url = self.url(entity_table(kind));
        // `pinecone_id` marks that vectors exist; it holds the entity id itself.
        let builder = self
            .http
            .patch(&url)
            .query(&[(id_column, format!("eq.{}", entity_id))])
            .json(&json!({
                "pinecone_id": entity_id,
                "embedding_checksum": checksum,
            }));
        self.send(url, builder).await?;
        Ok(())
    }
}
