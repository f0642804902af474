use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Characters (besides ASCII alphanumerics) that stay inside a skill token, so `c++`, `c#`,
/// `node.js` and `ci/cd` survive tokenization.
const TOKEN_PUNCTUATION: &[char] = &['+', '#', '.', '-', '_', '/'];

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || TOKEN_PUNCTUATION.contains(&c)
}

fn tokens(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(|c: char| !is_token_char(c))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Lowercased skill tokens from `raw`, deduplicated in first-seen order.
pub fn normalize_skills<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in raw {
        for token in tokens(item.as_ref()) {
            if seen.insert(token.clone()) {
                out.push(token);
            }
        }
    }
    out
}

/// Required-vs-profile skill breakdown for one posting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillAnalysis {
    pub required: Vec<String>,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    /// `|matched ∩ required| / max(1, |required|)` in `[0, 1]`; 1.0 when nothing is required.
    pub coverage: f64,
}

impl SkillAnalysis {
    /// Moves required tokens the judge reported as matched from `missing` to `matched`.
    pub fn absorb_judge_matches<S: AsRef<str>>(&mut self, judge_matched: &[S]) {
        let confirmed: HashSet<String> =
            normalize_skills(judge_matched.iter().map(|s| s.as_ref()))
                .into_iter()
                .collect();
        if confirmed.is_empty() {
            return;
        }

        let (now_matched, still_missing): (Vec<String>, Vec<String>) = self
            .missing
            .drain(..)
            .partition(|token| confirmed.contains(token));

        self.missing = still_missing;
        let newly: HashSet<String> = now_matched.into_iter().collect();
        let previously: HashSet<&String> = self.matched.iter().collect();
        let mut matched: Vec<String> = self
            .required
            .iter()
            .filter(|t| previously.contains(t) || newly.contains(*t))
            .cloned()
            .collect();
        matched.dedup();
        self.matched = matched;
        self.coverage = coverage_ratio(&self.required, &self.matched);
    }
}

/// Compares a posting's required skills against a profile's skills.
pub fn analyze_required_vs_profile<R, P>(required_raw: R, profile_raw: P) -> SkillAnalysis
where
    R: IntoIterator,
    R::Item: AsRef<str>,
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    let required = normalize_skills(required_raw);
    let have: HashSet<String> = normalize_skills(profile_raw).into_iter().collect();

    let (matched, missing): (Vec<String>, Vec<String>) =
        required.iter().cloned().partition(|t| have.contains(t));

    let coverage = coverage_ratio(&required, &matched);
    SkillAnalysis {
        required,
        matched,
        missing,
        coverage,
    }
}

/// Fraction of `required` found in `matched`. An empty requirement list is fully covered.
pub fn coverage_ratio(required: &[String], matched: &[String]) -> f64 {
    if required.is_empty() {
        return 1.0;
    }
    let required_set: HashSet<&String> = required.iter().collect();
    let hits = matched
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|m| required_set.contains(m))
        .count();
    (hits as f64 / required.len().max(1) as f64).clamp(0.0, 1.0)
}
