use serial_test::serial;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::*;
use crate::entity::{Posting, Profile};
use crate::facet::Facet;
use crate::store::{InMemoryStore, QueueKind};
use crate::vectordb::{MockVectorIndex, VectorIndex, VectorPoint};

#[test]
fn test_engine_config_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.max_concurrent_calls, 8);
    assert_eq!(config.stale_item_limit, 200);
    assert_eq!(config.reranker.top_k, 50);
    assert_eq!(config.reranker.alpha, 0.65);
    assert_eq!(config.judge.top_k, 15);
    assert_eq!(config.timeouts.vector, Duration::from_secs(5));
    assert_eq!(config.timeouts.reranker, Duration::from_secs(10));
    assert_eq!(config.timeouts.judge, Duration::from_secs(30));
    assert_eq!(config.timeouts.store, Duration::from_secs(5));
    assert!(config.persist_snapshots);
    assert!(!config.auto_enqueue_stale_items);
    assert!(config.validate().is_ok());
}

#[test]
#[should_panic(expected = "max_concurrent_calls must be positive")]
fn test_engine_config_rejects_zero_concurrency() {
    let _ = EngineConfig::default().with_max_concurrent_calls(0);
}

#[test]
fn test_engine_config_validate_namespaces() {
    let config = EngineConfig::default().with_namespaces("", "job_posts");
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_engine_config_from_env() {
    unsafe {
        std::env::set_var("MATCHFUSE_MAX_CONCURRENT_CALLS", "3");
        std::env::set_var("MATCHFUSE_PERSIST_SNAPSHOTS", "false");
        std::env::set_var("MATCHFUSE_AUTO_ENQUEUE_STALE_ITEMS", "1");
        std::env::set_var("MATCHFUSE_STALE_ITEM_LIMIT", "25");
        std::env::set_var("MATCHFUSE_ITEM_NAMESPACE", "posts_v2");
        std::env::set_var("MATCHFUSE_JUDGE_TIMEOUT_MS", "1500");
    }

    let config = EngineConfig::from_env();
    assert_eq!(config.max_concurrent_calls, 3);
    assert!(!config.persist_snapshots);
    assert!(config.auto_enqueue_stale_items);
    assert_eq!(config.stale_item_limit, 25);
    assert_eq!(config.item_namespace, "posts_v2");
    assert_eq!(config.query_namespace, "job_seekers");
    assert_eq!(config.timeouts.judge, Duration::from_millis(1500));
    assert_eq!(config.timeouts.vector, Duration::from_secs(5));

    unsafe {
        std::env::remove_var("MATCHFUSE_MAX_CONCURRENT_CALLS");
        std::env::remove_var("MATCHFUSE_PERSIST_SNAPSHOTS");
        std::env::remove_var("MATCHFUSE_AUTO_ENQUEUE_STALE_ITEMS");
        std::env::remove_var("MATCHFUSE_STALE_ITEM_LIMIT");
        std::env::remove_var("MATCHFUSE_ITEM_NAMESPACE");
        std::env::remove_var("MATCHFUSE_JUDGE_TIMEOUT_MS");
    }
}

#[test]
#[serial]
fn test_engine_config_from_env_ignores_invalid_values() {
    unsafe {
        std::env::set_var("MATCHFUSE_MAX_CONCURRENT_CALLS", "0");
        std::env::set_var("MATCHFUSE_VECTOR_TIMEOUT_MS", "soon");
    }

    let config = EngineConfig::from_env();
    assert_eq!(config.max_concurrent_calls, 8);
    assert_eq!(config.timeouts.vector, Duration::from_secs(5));

    unsafe {
        std::env::remove_var("MATCHFUSE_MAX_CONCURRENT_CALLS");
        std::env::remove_var("MATCHFUSE_VECTOR_TIMEOUT_MS");
    }
}

#[test]
fn test_rank_options_weights_override_defaults() {
    let options = RankOptions::default().with_weight(Facet::Skills, 0.8);
    let weights = options.facet_weights();
    assert_eq!(weights.get(Facet::Skills), 0.8);
    assert_eq!(weights.get(Facet::Experience), 0.30);
    assert_eq!(options.top_k_per_facet, 20);
    assert_eq!(options.min_facets, 1);
}

#[test]
fn test_outcome_method_joins_scoring_stages() {
    let outcome = RankingOutcome {
        results: Vec::new(),
        completed_stages: vec![Stage::Vector, Stage::Judge, Stage::Penalize],
    };
    assert_eq!(outcome.method(), "vector+judge");
    assert!(outcome.ran(Stage::Judge));
    assert!(!outcome.ran(Stage::Rerank));
}

async fn seeded() -> (Arc<MockVectorIndex>, Arc<InMemoryStore>) {
    let index = Arc::new(MockVectorIndex::new());
    let store = Arc::new(
        InMemoryStore::new()
            .with_profile(Profile::new("s1").with_skills(["rust"]).with_experience("5 years"))
            .with_postings([
                Posting::new("p1").with_skills(["rust"]),
                Posting::new("p2").with_skills(["rust"]),
            ]),
    );
    index
        .upsert(
            "job_seekers",
            vec![VectorPoint::for_facet("s1", Facet::Skills, vec![1.0, 0.0])],
        )
        .await
        .unwrap();
    index
        .upsert(
            "job_posts",
            vec![
                VectorPoint::for_facet("p1", Facet::Skills, vec![1.0, 0.0]),
                VectorPoint::for_facet("p2", Facet::Skills, vec![0.9, 0.1]),
            ],
        )
        .await
        .unwrap();
    (index, store)
}

#[tokio::test]
async fn test_zero_weight_facets_are_not_queried() {
    let (index, store) = seeded().await;
    let engine = Orchestrator::with_store(index.clone(), store, EngineConfig::default());

    let options = RankOptions::default().with_weight(Facet::Skills, 0.0);
    let outcome = engine.rank_detailed("s1", options).await.unwrap();

    // Skills is the seeker's only facet; with no weight nothing is retrieved.
    assert!(outcome.results.is_empty());
    assert_eq!(index.query_count(), 0);
}

#[tokio::test]
async fn test_expired_deadline_before_retrieval_fails() {
    let (index, store) = seeded().await;
    let engine = Orchestrator::with_store(index, store, EngineConfig::default());

    let options = RankOptions::default().with_deadline(Instant::now());
    let err = engine.rank("s1", options).await.unwrap_err();
    assert!(matches!(err, RankingError::NoCandidatesEvaluated { .. }));
}

#[tokio::test]
async fn test_unknown_query_id() {
    let (index, store) = seeded().await;
    let engine = Orchestrator::with_store(index, store.clone(), EngineConfig::default());

    let err = engine.rank("ghost", RankOptions::default()).await.unwrap_err();
    assert!(matches!(err, RankingError::UnknownQuery { .. }));
    assert!(store.pending_entries(QueueKind::Query).is_empty());
}

#[tokio::test]
async fn test_vector_only_pipeline_persists_snapshots() {
    let (index, store) = seeded().await;
    let engine = Orchestrator::with_store(index, store.clone(), EngineConfig::default());

    let outcome = engine.rank_detailed("s1", RankOptions::default()).await.unwrap();
    assert_eq!(
        outcome.completed_stages,
        vec![Stage::Vector, Stage::Penalize]
    );
    assert_eq!(outcome.results[0].item_id, "p1");
    assert!(outcome.results.iter().all(|r| r.is_consistent()));
    assert!(
        outcome
            .results
            .iter()
            .all(|r| r.analysis.rationale.is_some())
    );

    let snapshots = store.snapshots();
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots.iter().all(|s| s.method == "vector"));
    assert!(snapshots.iter().all(|s| s.model_version == "none|none"));
}
