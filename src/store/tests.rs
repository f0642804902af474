use chrono::{TimeDelta, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::cached::CachedEntityStore;
use super::memory::InMemoryStore;
use super::postgrest::in_filter;
use super::rows::{posting_from_row, profile_from_row, queue_entry_from_row, snapshot_row};
use super::types::{QueueEntry, QueueKind, QueueReason, ScoreSnapshot};
use super::{EntityStore, FreshnessQueue, SnapshotLog};
use crate::entity::{Posting, Profile};
use crate::facet::{Facet, FacetScores, FacetWeights};
use crate::scoring::ScoredResult;

const LEASE: Duration = Duration::from_secs(30);

fn store_with_postings() -> InMemoryStore {
    InMemoryStore::new()
        .with_profile(Profile::new("s1").with_email("ana@example.com"))
        .with_postings([
            Posting::new("p1").with_checksum("abc"),
            Posting::new("p2"),
            Posting::new("p3"),
        ])
}

#[tokio::test]
async fn test_profile_lookup_by_email() {
    let store = store_with_postings();
    assert_eq!(
        store
            .profile_id_by_lookup_key(" ana@example.com ")
            .await
            .unwrap(),
        Some("s1".to_string())
    );
    assert_eq!(
        store.profile_id_by_lookup_key("nobody@example.com").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_postings_skips_unknown_ids() {
    let store = store_with_postings();
    let found = store
        .postings(&["p1".to_string(), "missing".to_string(), "p3".to_string()])
        .await
        .unwrap();
    let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p3"]);
}

#[tokio::test]
async fn test_stale_postings_lack_checksum() {
    let store = store_with_postings();
    assert_eq!(store.stale_postings(10).await.unwrap(), vec!["p2", "p3"]);
    assert_eq!(store.stale_postings(1).await.unwrap(), vec!["p2"]);
}

#[tokio::test]
async fn test_enqueue_is_idempotent_while_pending() {
    let store = InMemoryStore::new();
    let first = store
        .enqueue(QueueKind::Query, "s1", QueueReason::Insert)
        .await
        .unwrap();
    let second = store
        .enqueue(QueueKind::Query, "s1", QueueReason::Update)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.reason, QueueReason::Insert);

    // Same id on the other side is a separate entry.
    store
        .enqueue(QueueKind::Item, "s1", QueueReason::Insert)
        .await
        .unwrap();
    assert_eq!(store.queue_entries().len(), 2);

    store.complete(&first).await.unwrap();
    let third = store
        .enqueue(QueueKind::Query, "s1", QueueReason::Update)
        .await
        .unwrap();
    assert_ne!(third.id, first.id);
}

#[tokio::test]
async fn test_claim_leases_oldest_first() {
    let store = InMemoryStore::new();
    for id in ["a", "b", "c"] {
        store
            .enqueue(QueueKind::Item, id, QueueReason::Insert)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let claimed = store.claim(QueueKind::Item, 2, LEASE).await.unwrap();
    let ids: Vec<&str> = claimed.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(claimed.iter().all(|e| e.claimed_until.is_some()));

    let rest = store.claim(QueueKind::Item, 10, LEASE).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].entity_id, "c");

    assert!(store.claim(QueueKind::Item, 10, LEASE).await.unwrap().is_empty());
    assert!(store.claim(QueueKind::Query, 10, LEASE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_lease_is_claimable_again() {
    let store = InMemoryStore::new();
    store
        .enqueue(QueueKind::Item, "a", QueueReason::Insert)
        .await
        .unwrap();

    let now = Utc::now();
    assert_eq!(store.claim_at(QueueKind::Item, 10, LEASE, now).len(), 1);
    assert!(store.claim_at(QueueKind::Item, 10, LEASE, now).is_empty());

    let later = now + TimeDelta::seconds(31);
    let reclaimed = store.claim_at(QueueKind::Item, 10, LEASE, later);
    assert_eq!(reclaimed.len(), 1);
}

#[tokio::test]
async fn test_completed_entries_are_never_claimed() {
    let store = InMemoryStore::new();
    let entry = store
        .enqueue(QueueKind::Query, "s1", QueueReason::Manual)
        .await
        .unwrap();
    store.complete(&entry).await.unwrap();

    let later = Utc::now() + TimeDelta::hours(1);
    assert!(store.claim_at(QueueKind::Query, 10, LEASE, later).is_empty());
    assert!(store.pending_entries(QueueKind::Query).is_empty());
}

#[tokio::test]
async fn test_complete_unknown_entry_errors() {
    let store = InMemoryStore::new();
    let ghost = QueueEntry::new(QueueKind::Item, "p1", QueueReason::Insert);
    assert!(store.complete(&ghost).await.is_err());
}

#[tokio::test]
async fn test_concurrent_claims_never_share_entries() {
    let store = Arc::new(InMemoryStore::new());
    for i in 0..50 {
        store
            .enqueue(QueueKind::Item, &format!("p{}", i), QueueReason::Backfill)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.claim(QueueKind::Item, 5, LEASE).await.unwrap()
        }));
    }

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        for entry in handle.await.unwrap() {
            assert!(seen.insert(entry.id), "entry claimed twice");
        }
    }
    assert_eq!(seen.len(), 40);
}

#[tokio::test]
async fn test_record_checksum_updates_entity() {
    let store = store_with_postings();
    store
        .record_checksum(QueueKind::Item, "p2", "deadbeef")
        .await
        .unwrap();
    store
        .record_checksum(QueueKind::Query, "s1", "cafe")
        .await
        .unwrap();

    assert_eq!(
        store.get_posting("p2").unwrap().embedding_checksum.as_deref(),
        Some("deadbeef")
    );
    assert_eq!(
        store.get_profile("s1").unwrap().embedding_checksum.as_deref(),
        Some("cafe")
    );
    assert_eq!(store.stale_postings(10).await.unwrap(), vec!["p3"]);
}

#[tokio::test]
async fn test_snapshot_append_and_failure() {
    let store = InMemoryStore::new();
    let result = ScoredResult::new(
        "p1",
        FacetScores::from([(Facet::Skills, 80.0)]),
        FacetWeights::default().restricted_to(&[Facet::Skills]),
    );
    let snapshot = ScoreSnapshot::from_result("s1", &result, "vector", "none|none", Utc::now());

    store.append(vec![snapshot.clone()]).await.unwrap();
    assert_eq!(store.snapshots(), vec![snapshot.clone()]);

    store.set_snapshot_failure(true);
    assert!(store.append(vec![snapshot]).await.is_err());
    assert_eq!(store.snapshots().len(), 1);
}

#[tokio::test]
async fn test_read_failure_surfaces_as_unavailable() {
    let store = store_with_postings();
    store.set_read_failure(true);
    assert!(matches!(
        store.profile("s1").await,
        Err(super::StoreError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn test_cached_store_serves_from_cache() {
    let cached = CachedEntityStore::new(store_with_postings());

    let first = cached.profile("s1").await.unwrap().unwrap();
    let postings = cached
        .postings(&["p1".to_string(), "p2".to_string()])
        .await
        .unwrap();
    assert_eq!(postings.len(), 2);

    cached.inner().set_read_failure(true);
    assert_eq!(cached.profile("s1").await.unwrap(), Some(first));
    assert_eq!(
        cached
            .postings(&["p2".to_string(), "p1".to_string()])
            .await
            .unwrap()
            .len(),
        2
    );
    assert!(cached.postings(&["p3".to_string()]).await.is_err());

    cached.invalidate("s1");
    assert!(cached.profile("s1").await.is_err());
}

#[test]
fn test_profile_row_coercion() {
    let row = json!({
        "job_seeker_id": 42,
        "email": "ana@example.com",
        "full_name": "Ana",
        "skills": "Rust, SQL ,  ",
        "experience": [{"role": "Engineer", "years": 4}],
        "education": "",
        "licenses_certifications": ["PMP"],
        "embedding_checksum": null
    });
    let profile = profile_from_row(&row).unwrap();
    assert_eq!(profile.id, "42");
    assert_eq!(profile.skills, vec!["Rust", "SQL"]);
    assert_eq!(
        profile.experience.as_deref(),
        Some(r#"[{"role":"Engineer","years":4}]"#)
    );
    assert_eq!(profile.education, None);
    assert_eq!(profile.licenses, vec!["PMP"]);

    assert!(profile_from_row(&json!({"email": "x"})).is_none());
}

#[test]
fn test_posting_row_coercion() {
    let row = json!({
        "job_post_id": "p1",
        "job_title": "Backend Engineer",
        "employer": "Acme",
        "job_skills": ["rust", "postgres"],
        "job_experience": "3+ years",
        "job_licenses_certifications": null
    });
    let posting = posting_from_row(&row).unwrap();
    assert_eq!(posting.company.as_deref(), Some("Acme"));
    assert_eq!(posting.experience.as_deref(), Some("3+ years"));
    assert!(posting.licenses.is_empty());
    assert!(!posting.required_facets().contains(Facet::Licenses));
}

#[test]
fn test_queue_row_decoding() {
    let row = json!({
        "id": 7,
        "job_post_id": "p9",
        "reason": "insert",
        "enqueued_at": "2024-05-01T12:00:00.123456+00:00",
        "processed_at": null
    });
    let entry = queue_entry_from_row(QueueKind::Item, &row).unwrap();
    assert_eq!(entry.id, "7");
    assert_eq!(entry.entity_id, "p9");
    assert_eq!(entry.reason, QueueReason::Insert);
    assert!(entry.is_pending());

    let wrong_side = queue_entry_from_row(QueueKind::Query, &row);
    assert!(wrong_side.is_err());
}

#[test]
fn test_snapshot_row_columns() {
    let result = ScoredResult::new(
        "p1",
        FacetScores::from([(Facet::Skills, 80.456), (Facet::Experience, 60.0)]),
        FacetWeights::default().restricted_to(&[Facet::Skills, Facet::Experience]),
    );
    let snapshot = ScoreSnapshot::from_result(
        "s1",
        &result,
        "vector+rerank",
        "lexical-overlap|none",
        Utc::now(),
    );
    let row = snapshot_row(&snapshot);

    assert_eq!(row["job_seeker_id"], "s1");
    assert_eq!(row["job_post_id"], "p1");
    assert_eq!(row["section_scores"]["skills"], 80.46);
    assert_eq!(row["rerank_enabled"], true);
    assert_eq!(row["confidence"], result.overall);
}

#[test]
fn test_in_filter_quotes_ids() {
    let ids = vec!["a".to_string(), "b\"c".to_string()];
    assert_eq!(in_filter(&ids), r#"in.("a","bc")"#);
}
