use serde::{Deserialize, Serialize};

use crate::entity::{Posting, Profile};
use crate::facet::{Facet, FacetScores, RequiredFacets};

/// The seeker side of a judge request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryContext {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    pub licenses: Vec<String>,
}

impl From<&Profile> for QueryContext {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            full_name: profile.full_name.clone(),
            skills: profile.skills.clone(),
            experience: profile.experience.clone(),
            education: profile.education.clone(),
            licenses: profile.licenses.clone(),
        }
    }
}

/// One posting in a judge request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemContext {
    pub id: String,
    pub job_title: String,
    pub company: String,
    pub job_overview: String,
    pub job_skills: Vec<String>,
    pub experience_req: String,
    pub education_req: String,
    pub licenses_req: Vec<String>,
    pub location: String,
    pub seniority: String,
    /// Facets this posting is scored on.
    pub required_facets: Vec<Facet>,
}

impl From<&Posting> for ItemContext {
    fn from(posting: &Posting) -> Self {
        let required: RequiredFacets = posting.required_facets();
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            id: posting.id.clone(),
            job_title: text(&posting.title),
            company: text(&posting.company),
            job_overview: text(&posting.overview),
            job_skills: posting.skills.clone(),
            experience_req: text(&posting.experience),
            education_req: text(&posting.education),
            licenses_req: posting.licenses.clone(),
            location: text(&posting.location),
            seniority: text(&posting.seniority),
            required_facets: Facet::ALL
                .into_iter()
                .filter(|f| required.contains(*f))
                .collect(),
        }
    }
}

/// A requirement the judge found satisfied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedAttribute {
    pub name: String,
    pub evidence: Option<String>,
}

/// The judge's view of one posting. Scores are raw 0–100 as returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub item_id: String,
    pub facet_scores: FacetScores,
    pub overall: Option<f64>,
    pub matched: Vec<MatchedAttribute>,
    pub missing: Vec<String>,
    pub domain_mismatch: bool,
    pub rationale: Option<String>,
}
