//! Matchfuse CLI: ranks job postings for one job seeker and prints the best matches.
//!
//! Usage: `matchfuse <job_seeker_id|email> [top_k_per_facet] [min_facets]`

use std::sync::Arc;

use anyhow::{Context, bail};
use mimalloc::MiMalloc;

use matchfuse::config::Config;
use matchfuse::embedding::{PairwiseScorer, Reranker};
use matchfuse::judge::{GenaiJudge, LlmJudge};
use matchfuse::ranking::{EngineConfig, Orchestrator, RankOptions};
use matchfuse::store::{CachedEntityStore, PostgrestConfig, PostgrestStore};
use matchfuse::vectordb::QdrantIndex;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const PRINT_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(target) = args.next() else {
        bail!("usage: matchfuse <job_seeker_id|email> [top_k_per_facet] [min_facets]");
    };
    let mut options = RankOptions::default();
    if let Some(top_k) = args.next() {
        options = options.with_top_k_per_facet(top_k.parse().context("top_k_per_facet")?);
    }
    if let Some(min_facets) = args.next() {
        options = options.with_min_facets(min_facets.parse().context("min_facets")?);
    }

    let config = Config::from_env()?;
    config.validate()?;
    let engine_config = EngineConfig::from_env();
    engine_config
        .validate()
        .map_err(|reason| anyhow::anyhow!("invalid engine config: {reason}"))?;

    tracing::info!(
        qdrant_url = %config.qdrant_url,
        reranker = engine_config.reranker.enabled,
        judge = engine_config.judge.enabled,
        "Matchfuse starting"
    );

    let index = QdrantIndex::new(&config.qdrant_url).await?;
    if let Err(e) = index.health_check().await {
        tracing::warn!(error = %e, "Qdrant health check failed");
    }
    let index = Arc::new(index);

    let (url, key) = config.postgrest()?;
    let store = Arc::new(PostgrestStore::new(
        PostgrestConfig::new(url, key).with_timeout(engine_config.timeouts.store),
    )?);
    let entities = Arc::new(CachedEntityStore::with_capacity(
        (*store).clone(),
        config.cache_capacity,
        config.cache_ttl,
    ));

    let mut orchestrator = Orchestrator::new(
        index,
        entities,
        store.clone(),
        store,
        engine_config.clone(),
    );

    if engine_config.reranker.enabled {
        let mut reranker_config = engine_config.reranker.clone();
        if reranker_config.model_path.is_none() {
            reranker_config.model_path = config.reranker_path.clone();
        }
        let reranker: Arc<dyn PairwiseScorer> = Arc::new(Reranker::load(reranker_config)?);
        orchestrator = orchestrator.with_reranker(reranker);
    }

    if engine_config.judge.enabled {
        match GenaiJudge::from_config(&engine_config.judge) {
            Ok(judge) => {
                let judge: Arc<dyn LlmJudge> = Arc::new(judge);
                orchestrator = orchestrator.with_judge(judge);
            }
            Err(e) => tracing::warn!("Judge unavailable, ranking without it: {}", e),
        }
    }

    let outcome = if target.contains('@') {
        orchestrator.rank_by_lookup_key(&target, options).await?
    } else {
        orchestrator.rank_detailed(&target, options).await?
    };

    println!(
        "{} results for {} (method: {})",
        outcome.results.len(),
        target,
        outcome.method()
    );
    for (position, result) in outcome.results.iter().take(PRINT_LIMIT).enumerate() {
        println!(
            "{:>2}. {:<40} {:>6.2}  coverage {:.2}",
            position + 1,
            result.item_id,
            result.overall,
            result.analysis.coverage
        );
        if let Some(rationale) = &result.analysis.rationale {
            println!("    {}", rationale);
        }
    }

    Ok(())
}
