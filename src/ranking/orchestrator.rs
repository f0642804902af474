use chrono::Utc;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::error::RankingError;
use super::types::{RankOptions, RankingOutcome, Stage};
use crate::embedding::PairwiseScorer;
use crate::entity::{Posting, Profile, analyze_required_vs_profile, posting_text, profile_text};
use crate::facet::{Facet, FacetWeights};
use crate::judge::{ItemContext, LlmJudge, QueryContext};
use crate::scoring::{
    CalibratedVerdict, FacetHit, ScoredResult, aggregate, apply_rerank, calibrate_batch,
    fallback_rationale, fuse, penalty, sort_results,
};
use crate::store::{
    EntityStore, FreshnessQueue, QueueKind, QueueReason, ScoreSnapshot, SnapshotLog, StoreError,
};
use crate::vectordb::{SearchFilter, VectorDbError, VectorIndex};

const NO_MODEL: &str = "none";

/// Runs the ranking pipeline for one job seeker at a time.
///
/// Holds no per-call state; share it behind an `Arc`. Collaborator calls are bounded by one
/// semaphore of `max_concurrent_calls` permits; waiting for a permit counts against the stage
/// budget.
pub struct Orchestrator<V> {
    index: Arc<V>,
    entities: Arc<dyn EntityStore>,
    snapshots: Arc<dyn SnapshotLog>,
    queue: Arc<dyn FreshnessQueue>,
    reranker: Option<Arc<dyn PairwiseScorer>>,
    judge: Option<Arc<dyn LlmJudge>>,
    config: EngineConfig,
    limiter: Arc<Semaphore>,
}

impl<V: VectorIndex> Orchestrator<V> {
    pub fn new(
        index: Arc<V>,
        entities: Arc<dyn EntityStore>,
        snapshots: Arc<dyn SnapshotLog>,
        queue: Arc<dyn FreshnessQueue>,
        config: EngineConfig,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_calls.max(1)));
        Self {
            index,
            entities,
            snapshots,
            queue,
            reranker: None,
            judge: None,
            config,
            limiter,
        }
    }

    /// Uses one value for every store role.
    pub fn with_store<S>(index: Arc<V>, store: Arc<S>, config: EngineConfig) -> Self
    where
        S: EntityStore + SnapshotLog + FreshnessQueue + 'static,
    {
        Self::new(index, store.clone(), store.clone(), store, config)
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn PairwiseScorer>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_judge(mut self, judge: Arc<dyn LlmJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ranked postings for `query_id`, best first.
    pub async fn rank(
        &self,
        query_id: &str,
        options: RankOptions,
    ) -> Result<Vec<ScoredResult>, RankingError> {
        Ok(self.rank_detailed(query_id, options).await?.results)
    }

    /// Resolves the seeker by lookup key (email) and ranks for them.
    pub async fn rank_by_lookup_key(
        &self,
        key: &str,
        options: RankOptions,
    ) -> Result<RankingOutcome, RankingError> {
        let budget = self.config.timeouts.store;
        let id = bounded(budget, self.entities.profile_id_by_lookup_key(key))
            .await?
            .ok_or_else(|| RankingError::UnknownLookupKey {
                key: key.to_string(),
            })?;
        self.rank_detailed(&id, options).await
    }

    /// Like [`rank`](Self::rank), also reporting which stages ran.
    pub async fn rank_detailed(
        &self,
        query_id: &str,
        options: RankOptions,
    ) -> Result<RankingOutcome, RankingError> {
        let started = Instant::now();
        let deadline = options.deadline;
        let weights = options.facet_weights();

        if self.config.auto_enqueue_stale_items {
            self.enqueue_stale_items(deadline).await;
        }

        let profile = self.load_profile(query_id, deadline).await?;
        let query_vectors = self.query_vectors(query_id, &weights, deadline).await?;

        if query_vectors.is_empty() {
            let reason = QueueReason::Insert;
            info!(query_id, reason = reason.as_str(), "No query vectors; enqueued for embedding");
            if let Err(e) = self.queue.enqueue(QueueKind::Query, query_id, reason).await {
                warn!(query_id, error = %e, "Failed to enqueue query entity");
            }
            return Ok(RankingOutcome::default());
        }

        let hits = self
            .retrieve(query_vectors, options.top_k_per_facet, deadline)
            .await?;
        let mut results = aggregate(hits, &self.config.calibration, &weights, options.min_facets);
        let mut completed = vec![Stage::Vector];
        debug!(query_id, candidates = results.len(), "Aggregated facet hits");

        let postings = self.load_postings(&results, deadline).await;
        attach_skill_analysis(&mut results, &profile, &postings);

        if self
            .rerank_stage(&mut results, &profile, &postings, deadline)
            .await
        {
            completed.push(Stage::Rerank);
        }

        if self
            .judge_stage(&mut results, &profile, &postings, &weights, deadline)
            .await
        {
            completed.push(Stage::Judge);
        }

        for result in results.iter_mut() {
            penalty::apply(result, &self.config.penalty);
            if result.analysis.rationale.is_none() {
                result.analysis.rationale = Some(fallback_rationale(
                    &result.facet_scores,
                    &result.analysis.matched,
                    result.overall,
                ));
            }
        }
        sort_results(&mut results);
        completed.push(Stage::Penalize);

        let outcome = RankingOutcome {
            results,
            completed_stages: completed,
        };

        if self.config.persist_snapshots {
            self.persist(query_id, &outcome, deadline).await;
        }

        info!(
            query_id,
            results = outcome.results.len(),
            method = %outcome.method(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ranking complete"
        );
        Ok(outcome)
    }

    /// Time left for a stage, or `None` when the deadline has already passed.
    fn stage_budget(&self, stage_timeout: Duration, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            None => Some(stage_timeout),
            Some(deadline) => {
                let remaining = deadline.checked_duration_since(Instant::now())?;
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(stage_timeout))
                }
            }
        }
    }

    async fn enqueue_stale_items(&self, deadline: Option<Instant>) {
        let Some(budget) = self.stage_budget(self.config.timeouts.store, deadline) else {
            return;
        };

        let work = async {
            let stale = self.entities.stale_postings(self.config.stale_item_limit).await?;
            for id in &stale {
                self.queue
                    .enqueue(QueueKind::Item, id, QueueReason::Insert)
                    .await?;
            }
            Ok::<usize, StoreError>(stale.len())
        };

        match timeout(budget, work).await {
            Ok(Ok(0)) => {}
            Ok(Ok(count)) => debug!(count, "Enqueued stale postings"),
            Ok(Err(e)) => warn!(error = %e, "Stale posting enqueue failed"),
            Err(_) => warn!(
                budget_ms = budget.as_millis() as u64,
                "Stale posting enqueue timed out"
            ),
        }
    }

    /// The seeker's profile. A store that answers "no such seeker" is an error; a store that
    /// fails or times out yields an empty profile so vector ranking can still run.
    async fn load_profile(
        &self,
        query_id: &str,
        deadline: Option<Instant>,
    ) -> Result<Profile, RankingError> {
        let budget = self
            .stage_budget(self.config.timeouts.store, deadline)
            .ok_or_else(|| RankingError::NoCandidatesEvaluated {
                reason: "deadline expired before retrieval".to_string(),
            })?;

        match bounded(budget, self.entities.profile(query_id)).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(RankingError::UnknownQuery {
                id: query_id.to_string(),
            }),
            Err(e) => {
                warn!(query_id, error = %e, "Profile lookup failed; continuing with empty profile");
                Ok(Profile::new(query_id))
            }
        }
    }

    /// Stored vectors of the seeker's facets that carry positive weight.
    async fn query_vectors(
        &self,
        query_id: &str,
        weights: &FacetWeights,
        deadline: Option<Instant>,
    ) -> Result<Vec<(Facet, Vec<f32>)>, RankingError> {
        let budget = self
            .stage_budget(self.config.timeouts.vector, deadline)
            .ok_or_else(|| RankingError::NoCandidatesEvaluated {
                reason: "deadline expired before retrieval".to_string(),
            })?;

        let facets: Vec<Facet> = Facet::ALL
            .into_iter()
            .filter(|f| weights.get(*f) > 0.0)
            .collect();
        let ids = facets.iter().map(|f| f.vector_id(query_id)).collect();

        let mut fetched = match timeout(budget, self.index.fetch(&self.config.query_namespace, ids)).await
        {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(e)) => {
                return Err(RankingError::NoCandidatesEvaluated {
                    reason: format!("query vectors unavailable: {}", e),
                });
            }
            Err(_) => {
                return Err(RankingError::NoCandidatesEvaluated {
                    reason: format!(
                        "query vector fetch timed out after {}ms",
                        budget.as_millis()
                    ),
                });
            }
        };

        Ok(facets
            .into_iter()
            .filter_map(|f| fetched.remove(&f.vector_id(query_id)).map(|v| (f, v)))
            .collect())
    }

    /// One concurrent, filtered query per facet. Failed facets are dropped; if none succeed the
    /// call fails.
    async fn retrieve(
        &self,
        query_vectors: Vec<(Facet, Vec<f32>)>,
        top_k: u64,
        deadline: Option<Instant>,
    ) -> Result<Vec<FacetHit>, RankingError> {
        let budget = self
            .stage_budget(self.config.timeouts.vector, deadline)
            .ok_or_else(|| RankingError::NoCandidatesEvaluated {
                reason: "deadline expired before retrieval".to_string(),
            })?;
        let namespace = self.config.item_namespace.as_str();
        let attempted = query_vectors.len();

        let queries = query_vectors.into_iter().map(|(facet, vector)| async move {
            let call = async move {
                let _permit = self.limiter.acquire().await.ok();
                self.index
                    .query(namespace, vector, SearchFilter::facet(facet), top_k)
                    .await
            };
            let outcome = timeout(budget, call).await.unwrap_or_else(|_| {
                Err(VectorDbError::Timeout {
                    millis: budget.as_millis() as u64,
                })
            });
            (facet, outcome)
        });

        let mut hits = Vec::new();
        let mut failures = Vec::new();
        for (facet, outcome) in join_all(queries).await {
            match outcome {
                Ok(results) => {
                    debug!(facet = %facet, hits = results.len(), "Facet query complete");
                    hits.extend(results.iter().filter_map(FacetHit::from_search_result));
                }
                Err(e) => {
                    warn!(facet = %facet, error = %e, "Facet query failed; facet dropped");
                    failures.push(format!("{}: {}", facet, e));
                }
            }
        }

        if failures.len() == attempted {
            return Err(RankingError::NoCandidatesEvaluated {
                reason: failures.join("; "),
            });
        }
        Ok(hits)
    }

    async fn load_postings(
        &self,
        results: &[ScoredResult],
        deadline: Option<Instant>,
    ) -> HashMap<String, Posting> {
        if results.is_empty() {
            return HashMap::new();
        }
        let Some(budget) = self.stage_budget(self.config.timeouts.store, deadline) else {
            return HashMap::new();
        };

        let ids: Vec<String> = results.iter().map(|r| r.item_id.clone()).collect();
        match bounded(budget, self.entities.postings(&ids)).await {
            Ok(postings) => postings.into_iter().map(|p| (p.id.clone(), p)).collect(),
            Err(e) => {
                warn!(error = %e, "Posting lookup failed; continuing without posting context");
                HashMap::new()
            }
        }
    }

    async fn rerank_stage(
        &self,
        results: &mut [ScoredResult],
        profile: &Profile,
        postings: &HashMap<String, Posting>,
        deadline: Option<Instant>,
    ) -> bool {
        let Some(scorer) = self.reranker.as_ref().filter(|_| self.config.reranker.enabled) else {
            return false;
        };
        let count = self.config.reranker.top_k.min(results.len());
        if count == 0 {
            return false;
        }
        let query_text = profile_text(profile);
        if query_text.is_empty() {
            debug!(query_id = %profile.id, "Empty profile text; rerank skipped");
            return false;
        }
        let Some(budget) = self.stage_budget(self.config.timeouts.reranker, deadline) else {
            debug!("Deadline reached; rerank skipped");
            return false;
        };

        let pairs: Vec<(String, String)> = results[..count]
            .iter()
            .map(|r| {
                let candidate = postings.get(&r.item_id).map(posting_text).unwrap_or_default();
                (query_text.clone(), candidate)
            })
            .collect();

        let scorer = Arc::clone(scorer);
        let limiter = Arc::clone(&self.limiter);
        let task = async move {
            let permit = limiter.acquire_owned().await.ok();
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                scorer.predict(&pairs)
            })
            .await
        };

        let scores = match timeout(budget, task).await {
            Ok(Ok(Ok(scores))) => scores,
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Reranker failed; keeping hybrid order");
                return false;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Reranker task panicked; keeping hybrid order");
                return false;
            }
            Err(_) => {
                warn!(
                    budget_ms = budget.as_millis() as u64,
                    "Reranker timed out; keeping hybrid order"
                );
                return false;
            }
        };

        if scores.len() != count {
            warn!(
                expected = count,
                actual = scores.len(),
                "Reranker returned wrong score count; keeping hybrid order"
            );
            return false;
        }

        match apply_rerank(results, &scores, self.config.reranker.alpha) {
            Ok(()) => {
                debug!(reranked = count, "Rerank stage complete");
                true
            }
            Err(e) => {
                warn!(error = %e, "Rerank blend rejected; keeping hybrid order");
                false
            }
        }
    }

    async fn judge_stage(
        &self,
        results: &mut [ScoredResult],
        profile: &Profile,
        postings: &HashMap<String, Posting>,
        weights: &FacetWeights,
        deadline: Option<Instant>,
    ) -> bool {
        let Some(judge) = self.judge.as_ref().filter(|_| self.config.judge.enabled) else {
            return false;
        };
        let count = self.config.judge.top_k.min(results.len());
        let items: Vec<ItemContext> = results[..count]
            .iter()
            .filter_map(|r| postings.get(&r.item_id).map(ItemContext::from))
            .collect();
        if items.is_empty() {
            return false;
        }
        let Some(budget) = self.stage_budget(self.config.timeouts.judge, deadline) else {
            debug!("Deadline reached; judge skipped");
            return false;
        };

        let query = QueryContext::from(profile);
        let call = async {
            let _permit = self.limiter.acquire().await.ok();
            judge.score_batch(&query, &items).await
        };
        let verdicts = match timeout(budget, call).await {
            Ok(Ok(verdicts)) => verdicts,
            Ok(Err(e)) => {
                warn!(model = judge.model_id(), error = %e, "Judge failed; stage skipped");
                return false;
            }
            Err(_) => {
                warn!(
                    model = judge.model_id(),
                    budget_ms = budget.as_millis() as u64,
                    "Judge timed out; stage skipped"
                );
                return false;
            }
        };

        let asked: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        let mut seen = HashSet::new();
        let verdicts: Vec<_> = verdicts
            .into_iter()
            .filter(|v| asked.contains(v.item_id.as_str()) && seen.insert(v.item_id.clone()))
            .collect();
        if verdicts.is_empty() {
            warn!(model = judge.model_id(), "Judge returned no usable verdicts");
            return false;
        }

        let judged: HashMap<String, CalibratedVerdict> = calibrate_batch(verdicts)
            .into_iter()
            .map(|c| (c.verdict.item_id.clone(), c))
            .collect();

        for result in results.iter_mut() {
            let Some(verdict) = judged.get(&result.item_id) else {
                continue;
            };
            let required = postings
                .get(&result.item_id)
                .map(Posting::required_facets)
                .unwrap_or_default();
            fuse(result, verdict, required, weights, &self.config.fusion);
        }
        sort_results(results);

        debug!(
            model = judge.model_id(),
            judged = judged.len(),
            "Judge stage complete"
        );
        true
    }

    fn model_version(&self, outcome: &RankingOutcome) -> String {
        let reranker = self
            .reranker
            .as_ref()
            .filter(|_| outcome.ran(Stage::Rerank))
            .map(|r| r.model_id().to_string())
            .unwrap_or_else(|| NO_MODEL.to_string());
        let judge = self
            .judge
            .as_ref()
            .filter(|_| outcome.ran(Stage::Judge))
            .map(|j| j.model_id().to_string())
            .unwrap_or_else(|| NO_MODEL.to_string());
        format!("{}|{}", reranker, judge)
    }

    async fn persist(&self, query_id: &str, outcome: &RankingOutcome, deadline: Option<Instant>) {
        if outcome.results.is_empty() {
            return;
        }
        let Some(budget) = self.stage_budget(self.config.timeouts.store, deadline) else {
            debug!("Deadline reached; snapshots not persisted");
            return;
        };

        let method = outcome.method();
        let model_version = self.model_version(outcome);
        let calculated_at = Utc::now();
        let snapshots: Vec<ScoreSnapshot> = outcome
            .results
            .iter()
            .map(|r| ScoreSnapshot::from_result(query_id, r, &method, &model_version, calculated_at))
            .collect();

        match bounded(budget, self.snapshots.append(snapshots)).await {
            Ok(()) => debug!(query_id, count = outcome.results.len(), "Persisted score snapshots"),
            Err(e) => warn!(query_id, error = %e, "Snapshot append failed"),
        }
    }
}

/// Required-skill coverage for each result. Results without a loaded posting have no known
/// requirements and are fully covered.
fn attach_skill_analysis(
    results: &mut [ScoredResult],
    profile: &Profile,
    postings: &HashMap<String, Posting>,
) {
    for result in results.iter_mut() {
        let required: &[String] = postings
            .get(&result.item_id)
            .map(|p| p.skills.as_slice())
            .unwrap_or(&[]);
        result
            .analysis
            .set_skills(analyze_required_vs_profile(required, &profile.skills));
    }
}

/// Runs a store call under `budget`, mapping expiry to [`RankingError::StoreTimeout`].
async fn bounded<T, F>(budget: Duration, call: F) -> Result<T, RankingError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match timeout(budget, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(RankingError::StoreTimeout {
            millis: budget.as_millis() as u64,
        }),
    }
}
