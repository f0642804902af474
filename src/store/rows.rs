//! Mapping between PostgREST JSON rows and the engine's types.
//!
//! Column names follow the `job_seeker` / `job_post` tables. Loose columns (lists stored as
//! comma strings, JSON blobs stored as text) go through [`crate::entity::coerce`].

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use super::error::StoreError;
use super::types::{QueueEntry, QueueKind, QueueReason, ScoreSnapshot};
use crate::constants::round2;
use crate::entity::coerce::{to_list, to_text};
use crate::entity::{Posting, Profile};

pub const SEEKER_TABLE: &str = "job_seeker";
pub const POSTING_TABLE: &str = "job_post";
pub const SNAPSHOT_TABLE: &str = "job_match_scores";

pub const SEEKER_ID_COLUMN: &str = "job_seeker_id";
pub const POSTING_ID_COLUMN: &str = "job_post_id";

/// Queue table for `kind`.
pub fn queue_table(kind: QueueKind) -> &'static str {
    match kind {
        QueueKind::Query => "embedding_queue",
        QueueKind::Item => "embedding_queue_post",
    }
}

/// Entity id column shared by the entity table and its queue table.
pub fn entity_id_column(kind: QueueKind) -> &'static str {
    match kind {
        QueueKind::Query => SEEKER_ID_COLUMN,
        QueueKind::Item => POSTING_ID_COLUMN,
    }
}

pub fn entity_table(kind: QueueKind) -> &'static str {
    match kind {
        QueueKind::Query => SEEKER_TABLE,
        QueueKind::Item => POSTING_TABLE,
    }
}

fn field<'a>(row: &'a Map<String, Value>, key: &str) -> &'a Value {
    row.get(key).unwrap_or(&Value::Null)
}

fn id_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    to_text(field(row, key))
}

pub fn profile_from_row(row: &Value) -> Option<Profile> {
    let row = row.as_object()?;
    Some(Profile {
        id: id_field(row, SEEKER_ID_COLUMN)?,
        email: text_field(row, "email"),
        full_name: text_field(row, "full_name"),
        skills: to_list(field(row, "skills")),
        experience: text_field(row, "experience"),
        education: text_field(row, "education"),
        licenses: to_list(field(row, "licenses_certifications")),
        embedding_checksum: text_field(row, "embedding_checksum"),
    })
}

pub fn posting_from_row(row: &Value) -> Option<Posting> {
    let row = row.as_object()?;
    Some(Posting {
        id: id_field(row, POSTING_ID_COLUMN)?,
        title: text_field(row, "job_title"),
        company: text_field(row, "company").or_else(|| text_field(row, "employer")),
        overview: text_field(row, "job_overview"),
        skills: to_list(field(row, "job_skills")),
        experience: text_field(row, "job_experience"),
        education: text_field(row, "job_education"),
        licenses: to_list(field(row, "job_licenses_certifications")),
        location: text_field(row, "location"),
        seniority: text_field(row, "seniority"),
        embedding_checksum: text_field(row, "embedding_checksum"),
    })
}

fn timestamp_field(row: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = row.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

pub fn queue_entry_from_row(kind: QueueKind, row: &Value) -> Result<QueueEntry, StoreError> {
    let row = row.as_object().ok_or_else(|| StoreError::Decode {
        reason: "queue row is not an object".to_string(),
    })?;

    let id = id_field(row, "id").ok_or_else(|| StoreError::Decode {
        reason: "queue row has no id".to_string(),
    })?;
    let entity_id = id_field(row, entity_id_column(kind)).ok_or_else(|| StoreError::Decode {
        reason: format!("queue row {} has no {}", id, entity_id_column(kind)),
    })?;
    let reason = row
        .get("reason")
        .and_then(Value::as_str)
        .and_then(|r| r.parse().ok())
        .unwrap_or(QueueReason::Update);

    Ok(QueueEntry {
        id,
        kind,
        entity_id,
        reason,
        enqueued_at: timestamp_field(row, "enqueued_at").unwrap_or_else(Utc::now),
        claimed_until: timestamp_field(row, "claimed_until"),
        processed_at: timestamp_field(row, "processed_at"),
    })
}

pub fn queue_insert_row(kind: QueueKind, entity_id: &str, reason: QueueReason) -> Value {
    json!({
        entity_id_column(kind): entity_id,
        "reason": reason.as_str(),
    })
}

/// Row for the `job_match_scores` table.
pub fn snapshot_row(snapshot: &ScoreSnapshot) -> Value {
    let section_scores: Map<String, Value> = snapshot
        .facet_scores
        .iter()
        .map(|(facet, score)| (facet.as_str().to_string(), json!(round2(*score))))
        .collect();
    let weights: Map<String, Value> = snapshot
        .weights
        .iter()
        .map(|(facet, weight)| (facet.as_str().to_string(), json!(weight)))
        .collect();

    json!({
        "id": snapshot.id.to_string(),
        SEEKER_ID_COLUMN: snapshot.query_id,
        POSTING_ID_COLUMN: snapshot.item_id,
        "confidence": round2(snapshot.overall),
        "section_scores": section_scores,
        "weights": weights,
        "coverage": snapshot.coverage,
        "rerank_enabled": snapshot.method.split('+').any(|stage| stage == "rerank"),
        "method": snapshot.method,
        "model_version": snapshot.model_version,
        "calculated_at": snapshot.calculated_at.to_rfc3339(),
        "matched_skills": snapshot.matched,
        "missing_skills": snapshot.missing,
        "matched_explanations": snapshot.evidence,
        "overall_summary": snapshot.rationale,
        "domain_mismatch": snapshot.domain_mismatch,
    })
}
