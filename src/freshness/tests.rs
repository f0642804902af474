use std::sync::Arc;
use std::time::Duration;

use super::mock::{MOCK_EMBEDDING_DIM, MockEmbedder};
use super::refresher::{IndexRefresher, RefreshTarget, VectorRefresher};
use super::worker::{FreshnessConfig, FreshnessWorker};
use crate::constants::{DEFAULT_ITEM_NAMESPACE, DEFAULT_QUERY_NAMESPACE};
use crate::entity::{Posting, Profile};
use crate::facet::Facet;
use crate::hashing::content_checksum;
use crate::store::{FreshnessQueue, InMemoryStore, QueueKind, QueueReason};
use crate::vectordb::{MockVectorIndex, VectorIndex};

struct Harness {
    store: Arc<InMemoryStore>,
    index: Arc<MockVectorIndex>,
    embedder: Arc<MockEmbedder>,
    worker: FreshnessWorker,
}

fn harness(store: InMemoryStore) -> Harness {
    let store = Arc::new(store);
    let index = Arc::new(MockVectorIndex::new());
    let embedder = Arc::new(MockEmbedder::new());
    let refresher = Arc::new(IndexRefresher::new(Arc::clone(&index), embedder.clone()));
    let worker = FreshnessWorker::new(
        store.clone(),
        store.clone(),
        refresher,
        FreshnessConfig::default().with_idle_sleep(Duration::from_millis(10)),
    );
    Harness {
        store,
        index,
        embedder,
        worker,
    }
}

fn seeker() -> Profile {
    Profile::new("s1")
        .with_skills(["Rust", "Postgres"])
        .with_experience("4 years backend")
}

#[tokio::test]
async fn test_refresh_writes_one_point_per_facet() {
    let h = harness(InMemoryStore::new());
    let refresher = IndexRefresher::new(Arc::clone(&h.index), h.embedder.clone());

    let written = refresher
        .refresh(&RefreshTarget::Profile(seeker()))
        .await
        .unwrap();
    assert_eq!(written, 2);

    let fetched = h
        .index
        .fetch(
            DEFAULT_QUERY_NAMESPACE,
            vec![
                Facet::Skills.vector_id("s1"),
                Facet::Experience.vector_id("s1"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched["s1:skills"].len(), MOCK_EMBEDDING_DIM);
}

#[tokio::test]
async fn test_refresh_empty_entity_writes_nothing() {
    let h = harness(InMemoryStore::new());
    let refresher = IndexRefresher::new(Arc::clone(&h.index), h.embedder.clone());
    let written = refresher
        .refresh(&RefreshTarget::Posting(Posting::new("p1")))
        .await
        .unwrap();
    assert_eq!(written, 0);
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn test_refresh_deletes_vectors_of_emptied_facets() {
    let h = harness(InMemoryStore::new());
    let refresher = IndexRefresher::new(Arc::clone(&h.index), h.embedder.clone());
    let posting = Posting::new("p1")
        .with_skills(["Rust"])
        .with_experience("3 years");

    refresher
        .refresh(&RefreshTarget::Posting(posting.clone()))
        .await
        .unwrap();
    assert_eq!(h.index.point_count(DEFAULT_ITEM_NAMESPACE), 2);

    let mut edited = posting;
    edited.experience = None;
    let written = refresher
        .refresh(&RefreshTarget::Posting(edited))
        .await
        .unwrap();
    assert_eq!(written, 1);

    let fetched = h
        .index
        .fetch(
            DEFAULT_ITEM_NAMESPACE,
            vec![
                Facet::Skills.vector_id("p1"),
                Facet::Experience.vector_id("p1"),
            ],
        )
        .await
        .unwrap();
    assert!(fetched.contains_key("p1:skills"));
    assert!(!fetched.contains_key("p1:experience"));
}

#[tokio::test]
async fn test_refresh_of_blank_entity_clears_old_vectors() {
    let h = harness(InMemoryStore::new());
    let refresher = IndexRefresher::new(Arc::clone(&h.index), h.embedder.clone());
    refresher
        .refresh(&RefreshTarget::Profile(seeker()))
        .await
        .unwrap();
    assert_eq!(h.index.point_count(DEFAULT_QUERY_NAMESPACE), 2);

    let written = refresher
        .refresh(&RefreshTarget::Profile(Profile::new("s1")))
        .await
        .unwrap();
    assert_eq!(written, 0);
    assert_eq!(h.index.point_count(DEFAULT_QUERY_NAMESPACE), 0);
}

#[tokio::test]
async fn test_drain_refreshes_and_records_checksum() {
    let h = harness(InMemoryStore::new().with_profile(seeker()));
    h.store
        .enqueue(QueueKind::Query, "s1", QueueReason::Insert)
        .await
        .unwrap();

    let report = h.worker.drain_once(QueueKind::Query).await.unwrap();
    assert_eq!(report.claimed, 1);
    assert_eq!(report.refreshed, 1);

    let expected = content_checksum(&seeker().search_document());
    assert_eq!(
        h.store.get_profile("s1").unwrap().embedding_checksum,
        Some(expected)
    );
    assert!(h.store.pending_entries(QueueKind::Query).is_empty());
    assert_eq!(h.index.point_count(DEFAULT_QUERY_NAMESPACE), 2);
}

#[tokio::test]
async fn test_drain_skips_unchanged_checksum() {
    let mut profile = seeker();
    profile.embedding_checksum = Some(content_checksum(&profile.search_document()));
    let h = harness(InMemoryStore::new().with_profile(profile));
    h.store
        .enqueue(QueueKind::Query, "s1", QueueReason::Update)
        .await
        .unwrap();

    let report = h.worker.drain_once(QueueKind::Query).await.unwrap();
    assert_eq!(report.unchanged, 1);
    assert_eq!(h.embedder.calls(), 0);
    assert!(h.store.pending_entries(QueueKind::Query).is_empty());
}

#[tokio::test]
async fn test_manual_entry_forces_refresh() {
    let mut profile = seeker();
    profile.embedding_checksum = Some(content_checksum(&profile.search_document()));
    let h = harness(InMemoryStore::new().with_profile(profile));
    h.store
        .enqueue(QueueKind::Query, "s1", QueueReason::Manual)
        .await
        .unwrap();

    let report = h.worker.drain_once(QueueKind::Query).await.unwrap();
    assert_eq!(report.refreshed, 1);
    assert_eq!(h.embedder.calls(), 1);
}

#[tokio::test]
async fn test_drain_completes_missing_entities() {
    let h = harness(InMemoryStore::new());
    h.store
        .enqueue(QueueKind::Item, "gone", QueueReason::Insert)
        .await
        .unwrap();

    let report = h.worker.drain_once(QueueKind::Item).await.unwrap();
    assert_eq!(report.missing, 1);
    assert!(h.store.pending_entries(QueueKind::Item).is_empty());
}

#[tokio::test]
async fn test_failed_refresh_leaves_entry_pending() {
    let h = harness(
        InMemoryStore::new().with_postings([
            Posting::new("p1").with_skills(["Rust"]),
            Posting::new("p2").with_skills(["Cobol"]),
        ]),
    );
    h.embedder.fail_on("Cobol");
    for id in ["p1", "p2"] {
        h.store
            .enqueue(QueueKind::Item, id, QueueReason::Insert)
            .await
            .unwrap();
    }

    let report = h.worker.drain_once(QueueKind::Item).await.unwrap();
    assert_eq!(report.refreshed, 1);
    assert_eq!(report.failed, 1);

    let pending = h.store.pending_entries(QueueKind::Item);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].entity_id, "p2");
    assert!(h.store.get_posting("p2").unwrap().embedding_checksum.is_none());

    // Still leased, so an immediate second pass sees nothing.
    let again = h.worker.drain_once(QueueKind::Item).await.unwrap();
    assert_eq!(again.claimed, 0);
}

#[tokio::test]
async fn test_drain_respects_batch_size() {
    let postings: Vec<Posting> = (0..25)
        .map(|i| Posting::new(format!("p{:02}", i)).with_skills(["Rust"]))
        .collect();
    let h = harness(InMemoryStore::new().with_postings(postings));
    for i in 0..25 {
        h.store
            .enqueue(QueueKind::Item, &format!("p{:02}", i), QueueReason::Backfill)
            .await
            .unwrap();
    }

    let first = h.worker.drain_once(QueueKind::Item).await.unwrap();
    assert_eq!(first.claimed, 10);
    let total = h.worker.drain_all().await.unwrap();
    assert_eq!(total.claimed, 10);
    assert_eq!(h.index.point_count(DEFAULT_ITEM_NAMESPACE), 20);
    assert_eq!(h.store.pending_entries(QueueKind::Item).len(), 5);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown() {
    let h = harness(InMemoryStore::new().with_profile(seeker()));
    h.store
        .enqueue(QueueKind::Query, "s1", QueueReason::Insert)
        .await
        .unwrap();

    let worker = Arc::new(h.worker);
    let handle = Arc::clone(&worker).start();

    tokio::time::timeout(Duration::from_secs(2), async {
        while !h.store.pending_entries(QueueKind::Query).is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("queue drained");

    worker.shutdown();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker stopped")
        .unwrap();
    assert!(worker.is_shutdown());
}

#[test]
fn test_mock_embedder_is_deterministic() {
    let a = MockEmbedder::embed_text("Rust and SQL");
    let b = MockEmbedder::embed_text("rust AND sql");
    assert_eq!(a, b);
    assert!(MockEmbedder::embed_text("").iter().all(|x| *x == 0.0));
}
