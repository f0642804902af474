//! Test fixtures for integration tests.

use std::sync::Arc;

use matchfuse::constants::{DEFAULT_ITEM_NAMESPACE, DEFAULT_QUERY_NAMESPACE};
use matchfuse::facet::{Facet, FacetScores};
use matchfuse::judge::{JudgeVerdict, MatchedAttribute};
use matchfuse::ranking::{EngineConfig, Orchestrator};
use matchfuse::store::InMemoryStore;
use matchfuse::vectordb::{MockVectorIndex, VectorIndex, VectorPoint};
use matchfuse::{Posting, Profile};

pub const SEEKER_ID: &str = "seeker-1";

pub const SEEKER_EMAIL: &str = "dana@example.com";

pub fn seeker() -> Profile {
    let mut profile = Profile::new(SEEKER_ID)
        .with_email(SEEKER_EMAIL)
        .with_name("Dana Reyes")
        .with_skills(["rust", "tokio", "postgres"])
        .with_experience("Six years building backend services in Rust")
        .with_education("BSc Computer Science");
    profile.embedding_checksum = Some("seeker-checksum".to_string());
    profile
}

/// A backend posting requiring only skills and experience.
pub fn posting(id: &str) -> Posting {
    Posting::new(id)
        .with_title("Backend Engineer", "Acme")
        .with_overview("Build and run our matching services")
        .with_skills(["rust", "tokio"])
        .with_experience("3+ years of backend development")
        .with_checksum(format!("{}-checksum", id))
}

/// Judge verdict with the given skills/experience scores.
pub fn verdict(item_id: &str, skills: f64, experience: f64) -> JudgeVerdict {
    JudgeVerdict {
        item_id: item_id.to_string(),
        facet_scores: FacetScores::from([(Facet::Skills, skills), (Facet::Experience, experience)]),
        overall: Some((skills + experience) / 2.0),
        matched: vec![MatchedAttribute {
            name: "rust".to_string(),
            evidence: Some("Six years building backend services in Rust.".to_string()),
        }],
        missing: Vec::new(),
        domain_mismatch: false,
        rationale: Some("Strong backend fit.".to_string()),
    }
}

/// A mock index plus an in-memory store seeded with [`seeker`] and the given postings.
pub struct Harness {
    pub index: Arc<MockVectorIndex>,
    pub store: Arc<InMemoryStore>,
}

impl Harness {
    /// Seeker with skills and experience vectors already indexed.
    pub async fn new(postings: &[&str]) -> Self {
        let harness = Self::without_vectors(postings);
        harness
            .index
            .upsert(
                DEFAULT_QUERY_NAMESPACE,
                vec![
                    VectorPoint::for_facet(SEEKER_ID, Facet::Skills, vec![1.0, 0.0, 0.0, 0.0]),
                    VectorPoint::for_facet(SEEKER_ID, Facet::Experience, vec![0.0, 1.0, 0.0, 0.0]),
                ],
            )
            .await
            .expect("seed query vectors");
        harness
    }

    pub fn without_vectors(postings: &[&str]) -> Self {
        let store = InMemoryStore::new()
            .with_profile(seeker())
            .with_postings(postings.iter().map(|id| posting(id)));
        Self {
            index: Arc::new(MockVectorIndex::new()),
            store: Arc::new(store),
        }
    }

    /// Fixes the raw similarity each posting scores on `facet`.
    pub fn script(&self, facet: Facet, hits: &[(&str, f32)]) {
        self.index.script_hits(
            DEFAULT_ITEM_NAMESPACE,
            facet,
            hits.iter()
                .map(|(id, score)| (facet.vector_id(id), *score)),
        );
    }

    pub fn orchestrator(&self, config: EngineConfig) -> Orchestrator<MockVectorIndex> {
        Orchestrator::with_store(self.index.clone(), self.store.clone(), config)
    }
}
