use super::types::{Posting, Profile};
use crate::facet::Facet;

const PART_SEPARATOR: &str = " | ";

/// Flattens a profile into the single-line summary used as the reranker's query text.
pub fn profile_text(profile: &Profile) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = non_empty(&profile.full_name) {
        parts.push(format!("Name: {}", name));
    }
    if !profile.skills.is_empty() {
        parts.push(format!("Skills: {}", profile.skills.join(", ")));
    }
    if let Some(experience) = non_empty(&profile.experience) {
        parts.push(format!("Experience: {}", experience));
    }
    if let Some(education) = non_empty(&profile.education) {
        parts.push(format!("Education: {}", education));
    }
    if !profile.licenses.is_empty() {
        parts.push(format!("Licenses/Certs: {}", profile.licenses.join(", ")));
    }

    parts.join(PART_SEPARATOR)
}

/// Flattens a posting into the candidate text paired with [`profile_text`].
pub fn posting_text(posting: &Posting) -> String {
    let mut parts: Vec<String> = Vec::new();

    let title = non_empty(&posting.title).unwrap_or_default();
    let company = non_empty(&posting.company).unwrap_or_default();
    if !title.is_empty() || !company.is_empty() {
        parts.push(format!("{} at {}", title, company).trim().to_string());
    }
    if let Some(overview) = non_empty(&posting.overview) {
        parts.push(overview.to_string());
    }
    if !posting.skills.is_empty() {
        parts.push(format!("Required skills: {}", posting.skills.join(", ")));
    }
    if let Some(experience) = non_empty(&posting.experience) {
        parts.push(format!("Experience req: {}", experience));
    }
    if let Some(education) = non_empty(&posting.education) {
        parts.push(format!("Education req: {}", education));
    }
    if !posting.licenses.is_empty() {
        parts.push(format!("Licenses/Certs: {}", posting.licenses.join(", ")));
    }

    parts.join(PART_SEPARATOR)
}

/// Per-facet texts embedded into a profile's facet vectors. Empty facets are omitted.
pub fn profile_facet_texts(profile: &Profile) -> Vec<(Facet, String)> {
    facet_texts(
        &profile.skills,
        &profile.experience,
        &profile.education,
        &profile.licenses,
    )
}

/// Per-facet texts embedded into a posting's facet vectors. Empty facets are omitted.
pub fn posting_facet_texts(posting: &Posting) -> Vec<(Facet, String)> {
    facet_texts(
        &posting.skills,
        &posting.experience,
        &posting.education,
        &posting.licenses,
    )
}

fn facet_texts(
    skills: &[String],
    experience: &Option<String>,
    education: &Option<String>,
    licenses: &[String],
) -> Vec<(Facet, String)> {
    let mut out = Vec::with_capacity(Facet::ALL.len());
    if !skills.is_empty() {
        out.push((Facet::Skills, skills.join(", ")));
    }
    if let Some(text) = non_empty(experience) {
        out.push((Facet::Experience, text.to_string()));
    }
    if let Some(text) = non_empty(education) {
        out.push((Facet::Education, text.to_string()));
    }
    if !licenses.is_empty() {
        out.push((Facet::Licenses, licenses.join(", ")));
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
