//! End-to-end ranking tests against mock collaborators.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use matchfuse::embedding::MockScorer;
use matchfuse::facet::Facet;
use matchfuse::judge::{JudgeConfig, MockJudge};
use matchfuse::ranking::{EngineConfig, RankOptions, RankingError, RankingOutcome, Stage};
use matchfuse::scoring::{CalibrationConfig, FusionConfig, adaptive_alpha, calibrate};
use matchfuse::store::{QueueKind, QueueReason};
use matchfuse::Posting;

use common::fixtures::{Harness, SEEKER_EMAIL, SEEKER_ID, posting, verdict};

fn calibrated(raw: f32) -> f64 {
    calibrate(f64::from(raw), &CalibrationConfig::default())
}

fn assert_well_formed(outcome: &RankingOutcome) {
    for result in &outcome.results {
        assert!(result.is_consistent(), "{} breakdown drifted", result.item_id);
        assert!((0.0..=100.0).contains(&result.overall));
        assert!(result.analysis.rationale.is_some());
    }
    for pair in outcome.results.windows(2) {
        assert!(pair[0].overall >= pair[1].overall);
    }
}

/// p1 leads on skills, p2 trails; both have solid experience.
async fn two_postings() -> Harness {
    let harness = Harness::new(&["p1", "p2"]).await;
    harness.script(Facet::Skills, &[("p1", 0.90), ("p2", 0.70)]);
    harness.script(Facet::Experience, &[("p1", 0.80), ("p2", 0.80)]);
    harness
}

#[tokio::test]
async fn test_weak_experience_caps_overall() {
    let harness = Harness::new(&["p1", "p2"]).await;
    harness.script(Facet::Skills, &[("p1", 0.90), ("p2", 0.80)]);
    harness.script(Facet::Experience, &[("p1", 0.50), ("p2", 0.80)]);

    let engine = harness.orchestrator(EngineConfig::default());
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);

    let p1 = outcome
        .results
        .iter()
        .find(|r| r.item_id == "p1")
        .expect("p1 ranked");
    assert!(calibrated(0.50) < 15.0);
    assert!(p1.overall <= 15.0, "overall {} not capped", p1.overall);
    assert!(!p1.signals.penalties.is_empty());
    assert_eq!(outcome.results[0].item_id, "p2");
}

#[tokio::test]
async fn test_missing_query_vectors_enqueue_once() {
    let harness = Harness::without_vectors(&["p1"]);
    assert!(
        harness
            .store
            .get_profile(SEEKER_ID)
            .is_some_and(|p| p.embedding_checksum.is_some())
    );

    let engine = harness.orchestrator(EngineConfig::default());
    for _ in 0..2 {
        let results = engine
            .rank(SEEKER_ID, RankOptions::default())
            .await
            .expect("ranking should succeed");
        assert!(results.is_empty());
    }

    let pending = harness.store.pending_entries(QueueKind::Query);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].entity_id, SEEKER_ID);
    assert_eq!(pending[0].reason, QueueReason::Insert);
    assert_eq!(harness.index.query_count(), 0);
    assert!(harness.store.snapshots().is_empty());
}

#[tokio::test]
async fn test_close_agreement_uses_max_judge_weight() {
    let harness = Harness::new(&["p1"]).await;
    harness.script(Facet::Skills, &[("p1", 0.70)]);
    harness.script(Facet::Experience, &[("p1", 0.80)]);

    let judge = Arc::new(MockJudge::with_verdicts(vec![verdict("p1", 68.0, 90.0)]));
    let engine = harness
        .orchestrator(EngineConfig::default())
        .with_judge(judge.clone());
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);
    assert!(outcome.ran(Stage::Judge));
    assert_eq!(judge.requests(), vec![vec!["p1".to_string()]]);

    let vector_skills = calibrated(0.70);
    assert!((vector_skills - 68.0).abs() <= 2.0);
    let alpha = adaptive_alpha(vector_skills, 68.0, &FusionConfig::default());
    assert!((alpha - 0.65).abs() < 1e-12);

    let p1 = &outcome.results[0];
    let expected = 0.35 * vector_skills + 0.65 * 68.0;
    assert!((p1.facet_scores[&Facet::Skills] - expected).abs() < 1e-9);
    assert!(p1.signals.penalties.is_empty());
    assert_eq!(p1.analysis.rationale.as_deref(), Some("Strong backend fit."));
    assert_eq!(
        p1.analysis.evidence.get("rust").map(String::as_str),
        Some("Six years building backend services in Rust.")
    );
}

#[tokio::test]
async fn test_domain_mismatch_caps_core_facets() {
    let harness = Harness::new(&["p1"]).await;
    harness.script(Facet::Skills, &[("p1", 0.90)]);
    harness.script(Facet::Experience, &[("p1", 0.85)]);

    let mut mismatch = verdict("p1", 80.0, 70.0);
    mismatch.domain_mismatch = true;
    let engine = harness
        .orchestrator(EngineConfig::default())
        .with_judge(Arc::new(MockJudge::with_verdicts(vec![mismatch])));
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);

    let p1 = &outcome.results[0];
    assert!(p1.analysis.domain_mismatch);
    assert!(p1.facet_scores[&Facet::Skills] <= 5.0);
    assert!(p1.facet_scores[&Facet::Experience] <= 5.0);
    assert!(p1.overall <= 15.0);
}

#[tokio::test]
async fn test_reranker_can_reorder_leaders() {
    let harness = two_postings().await;
    harness.store.insert_posting(
        posting("p2").with_title("Platform Engineer", "Globex"),
    );

    let scorer = Arc::new(MockScorer::new().with_score("Platform", 10.0));
    let engine = harness
        .orchestrator(EngineConfig::default())
        .with_reranker(scorer.clone());
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);

    assert!(outcome.ran(Stage::Rerank));
    assert_eq!(scorer.calls(), 1);
    assert_eq!(outcome.results[0].item_id, "p2");
    assert_eq!(outcome.results[0].signals.reranked, Some(100.0));
    assert_eq!(outcome.method(), "vector+rerank");
}

#[tokio::test]
async fn test_reranker_outage_keeps_hybrid_order() {
    let harness = two_postings().await;
    let baseline = harness
        .orchestrator(EngineConfig::default().with_persist_snapshots(false))
        .rank(SEEKER_ID, RankOptions::default())
        .await
        .expect("baseline ranking");

    let scorer = Arc::new(MockScorer::new());
    scorer.set_failing(true);
    let engine = harness
        .orchestrator(EngineConfig::default())
        .with_reranker(scorer);
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);

    assert!(!outcome.ran(Stage::Rerank));
    let ids: Vec<&str> = outcome.results.iter().map(|r| r.item_id.as_str()).collect();
    let expected: Vec<&str> = baseline.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, expected);
    for (got, want) in outcome.results.iter().zip(&baseline) {
        assert!((got.overall - want.overall).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_malformed_judge_reply_is_ignored() {
    let harness = two_postings().await;
    let engine = harness
        .orchestrator(EngineConfig::default())
        .with_judge(Arc::new(MockJudge::with_raw_reply(
            "Sorry, I can't score these postings.",
        )));
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);

    assert_eq!(outcome.completed_stages, vec![Stage::Vector, Stage::Penalize]);
    assert!(outcome.results.iter().all(|r| r.signals.judge_overall.is_none()));
}

#[tokio::test]
async fn test_judge_disabled_by_config_is_skipped() {
    let harness = two_postings().await;
    let judge = Arc::new(MockJudge::with_verdicts(vec![verdict("p1", 90.0, 90.0)]));
    let engine = harness
        .orchestrator(EngineConfig::default().with_judge(JudgeConfig::disabled()))
        .with_judge(judge.clone());
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");

    assert!(!outcome.ran(Stage::Judge));
    assert!(judge.requests().is_empty());
}

#[tokio::test]
async fn test_deadline_returns_hybrid_results() {
    let harness = two_postings().await;
    let judge = Arc::new(MockJudge::with_verdicts(vec![verdict("p1", 90.0, 90.0)]));
    judge.set_delay(Some(Duration::from_secs(5)));
    let engine = harness.orchestrator(EngineConfig::default()).with_judge(judge);

    let started = Instant::now();
    let options = RankOptions::default().with_deadline(Instant::now() + Duration::from_millis(300));
    let outcome = engine
        .rank_detailed(SEEKER_ID, options)
        .await
        .expect("ranking should succeed");

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(outcome.ran(Stage::Vector));
    assert!(!outcome.ran(Stage::Judge));
    assert_eq!(outcome.results.len(), 2);
    assert_well_formed(&outcome);
}

#[tokio::test]
async fn test_rank_by_lookup_key() {
    let harness = two_postings().await;
    let engine = harness.orchestrator(EngineConfig::default());

    let outcome = engine
        .rank_by_lookup_key(SEEKER_EMAIL, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_eq!(outcome.results.len(), 2);

    let err = engine
        .rank_by_lookup_key("nobody@example.com", RankOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RankingError::UnknownLookupKey { .. }));
}

#[tokio::test]
async fn test_stale_postings_enqueued_when_enabled() {
    let harness = two_postings().await;
    harness
        .store
        .insert_posting(Posting::new("p3").with_title("Data Engineer", "Initech"));

    let engine = harness.orchestrator(EngineConfig::default().with_auto_enqueue_stale_items(true));
    engine
        .rank(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");

    let pending = harness.store.pending_entries(QueueKind::Item);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].entity_id, "p3");
}

#[tokio::test]
async fn test_total_vector_outage_is_an_error() {
    let harness = two_postings().await;
    harness.index.set_unavailable(true);

    let err = harness
        .orchestrator(EngineConfig::default())
        .rank(SEEKER_ID, RankOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RankingError::NoCandidatesEvaluated { .. }));
}

#[tokio::test]
async fn test_store_outage_degrades_to_vector_ranking() {
    let harness = two_postings().await;
    harness.store.set_read_failure(true);

    let engine = harness
        .orchestrator(EngineConfig::default())
        .with_reranker(Arc::new(MockScorer::new()));
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].item_id, "p1");
    assert!(outcome.ran(Stage::Vector));
    assert!(!outcome.ran(Stage::Rerank));
    assert!(!outcome.ran(Stage::Judge));
}

#[tokio::test]
async fn test_waiting_for_permit_respects_deadline() {
    let harness = two_postings().await;
    let judge = Arc::new(MockJudge::with_verdicts(vec![verdict("p1", 90.0, 90.0)]));
    judge.set_delay(Some(Duration::from_secs(3)));
    let engine = harness
        .orchestrator(
            EngineConfig::default()
                .with_max_concurrent_calls(1)
                .with_persist_snapshots(false),
        )
        .with_judge(judge.clone());

    let holder = engine.rank(SEEKER_ID, RankOptions::default());
    let waiter = async {
        while judge.requests().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let started = Instant::now();
        let options =
            RankOptions::default().with_deadline(Instant::now() + Duration::from_millis(300));
        let result = engine.rank(SEEKER_ID, options).await;
        (started.elapsed(), result)
    };
    let (held, (elapsed, waited)) = tokio::join!(holder, waiter);

    assert!(held.is_ok());
    assert!(elapsed < Duration::from_millis(1500), "waited {:?}", elapsed);
    assert!(matches!(
        waited,
        Err(RankingError::NoCandidatesEvaluated { .. })
    ));
}

#[tokio::test]
async fn test_single_facet_failure_is_tolerated() {
    let harness = two_postings().await;
    harness.index.fail_facet(Facet::Experience);

    let outcome = harness
        .orchestrator(EngineConfig::default())
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_well_formed(&outcome);
    assert_eq!(outcome.results.len(), 2);
    assert!(
        outcome
            .results
            .iter()
            .all(|r| !r.facet_scores.contains_key(&Facet::Experience))
    );
}

#[tokio::test]
async fn test_min_facets_drops_single_facet_hits() {
    let harness = Harness::new(&["p1", "p2"]).await;
    harness.script(Facet::Skills, &[("p1", 0.90), ("p2", 0.85)]);
    harness.script(Facet::Experience, &[("p1", 0.80)]);

    let results = harness
        .orchestrator(EngineConfig::default())
        .rank(SEEKER_ID, RankOptions::default().with_min_facets(2))
        .await
        .expect("ranking should succeed");
    let ids: Vec<&str> = results.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["p1"]);
}

#[tokio::test]
async fn test_snapshot_failure_does_not_fail_ranking() {
    let harness = two_postings().await;
    harness.store.set_snapshot_failure(true);

    let results = harness
        .orchestrator(EngineConfig::default())
        .rank(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");
    assert_eq!(results.len(), 2);
    assert!(harness.store.snapshots().is_empty());
}

#[tokio::test]
async fn test_snapshots_record_judge_model() {
    let harness = two_postings().await;
    let engine = harness
        .orchestrator(EngineConfig::default())
        .with_judge(Arc::new(MockJudge::with_verdicts(vec![
            verdict("p1", 90.0, 85.0),
            verdict("p2", 60.0, 80.0),
        ])));
    let outcome = engine
        .rank_detailed(SEEKER_ID, RankOptions::default())
        .await
        .expect("ranking should succeed");

    let snapshots = harness.store.snapshots();
    assert_eq!(snapshots.len(), outcome.results.len());
    for snapshot in &snapshots {
        assert_eq!(snapshot.query_id, SEEKER_ID);
        assert_eq!(snapshot.method, "vector+judge");
        assert_eq!(snapshot.model_version, "none|mock-judge");
    }
}
