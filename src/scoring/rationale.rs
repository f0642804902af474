use crate::facet::FacetScores;

/// Facets at or above this score are called out as strong.
const STRONG_FACET_SCORE: f64 = 80.0;
const MAX_LISTED_MATCHES: usize = 5;

/// Plain-language explanation used when no judge verdict is available for a result.
pub fn fallback_rationale(facet_scores: &FacetScores, matched: &[String], overall: f64) -> String {
    let mut parts = Vec::new();

    let strong: Vec<&str> = facet_scores
        .iter()
        .filter(|(_, score)| **score >= STRONG_FACET_SCORE)
        .map(|(facet, _)| facet.as_str())
        .collect();
    if !strong.is_empty() {
        parts.push(format!(
            "High semantic similarity in {} drove the score.",
            strong.join(", ")
        ));
    }

    if matched.is_empty() {
        parts.push(
            "No exact keyword matches were found; the score comes from semantic overlap \
             between your background and the role's requirements."
                .to_string(),
        );
    } else {
        let listed: Vec<&str> = matched
            .iter()
            .take(MAX_LISTED_MATCHES)
            .map(String::as_str)
            .collect();
        parts.push(format!("Exact matches found for: {}.", listed.join(", ")));
    }

    parts.push(format!(
        "Overall confidence is {} based on weighted similarity across facets.",
        crate::constants::round2(overall)
    ));

    parts.join(" ")
}
