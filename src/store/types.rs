use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::facet::{FacetScores, FacetWeights};
use crate::scoring::ScoredResult;

/// Which side of a match a queue entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    /// A job seeker.
    Query,
    /// A job posting.
    Item,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Query => "query",
            QueueKind::Item => "item",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueReason {
    Insert,
    Update,
    Manual,
    Backfill,
}

impl QueueReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueReason::Insert => "insert",
            QueueReason::Update => "update",
            QueueReason::Manual => "manual",
            QueueReason::Backfill => "backfill",
        }
    }
}

impl FromStr for QueueReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insert" => Ok(QueueReason::Insert),
            "update" => Ok(QueueReason::Update),
            "manual" => Ok(QueueReason::Manual),
            "backfill" => Ok(QueueReason::Backfill),
            other => Err(format!("unknown queue reason: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub kind: QueueKind,
    pub entity_id: String,
    pub reason: QueueReason,
    pub enqueued_at: DateTime<Utc>,
    pub claimed_until: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    pub fn new(kind: QueueKind, entity_id: impl Into<String>, reason: QueueReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            entity_id: entity_id.into(),
            reason,
            enqueued_at: Utc::now(),
            claimed_until: None,
            processed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.processed_at.is_none()
    }

    /// Unprocessed and not under an unexpired lease.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.claimed_until.is_none_or(|until| until <= now)
    }
}

/// Immutable record of one ranking result, appended after each call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub id: Uuid,
    pub query_id: String,
    pub item_id: String,
    pub overall: f64,
    pub facet_scores: FacetScores,
    pub weights: FacetWeights,
    pub coverage: f64,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub evidence: BTreeMap<String, String>,
    pub rationale: Option<String>,
    pub domain_mismatch: bool,
    /// `+`-joined stages that ran, e.g. `vector+rerank+judge`.
    pub method: String,
    /// `"<reranker>|<judge model>"`.
    pub model_version: String,
    pub calculated_at: DateTime<Utc>,
}

impl ScoreSnapshot {
    pub fn from_result(
        query_id: &str,
        result: &ScoredResult,
        method: &str,
        model_version: &str,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_id: query_id.to_string(),
            item_id: result.item_id.clone(),
            overall: result.overall,
            facet_scores: result.facet_scores.clone(),
            weights: result.effective_weights.clone(),
            coverage: result.analysis.coverage,
            matched: result.analysis.matched.clone(),
            missing: result.analysis.missing.clone(),
            evidence: result.analysis.evidence.clone(),
            rationale: result.analysis.rationale.clone(),
            domain_mismatch: result.analysis.domain_mismatch,
            method: method.to_string(),
            model_version: model_version.to_string(),
            calculated_at,
        }
    }
}
