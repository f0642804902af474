use serde_json::json;

use super::error::JudgeError;
use super::types::{ItemContext, QueryContext};

const SYSTEM_PROMPT: &str = "You are the relevance judge of a job-matching system. \
You compare one job seeker against several job postings and grade each posting independently. \
Write in plain language a non-native English speaker can follow. \
Output ONLY valid JSON, with no commentary and no code fences.";

const RUBRIC: &str = "For EACH posting in `postings`, return an object with:\n\
- \"id\": the posting id exactly as given.\n\
- \"scores\": an object with keys \"skills\", \"experience\", \"education\", \"licenses\"; \
each an integer 0-100 for how well the seeker meets that requirement. \
Use null for a facet the posting does not list in `required_facets`.\n\
- \"overall\": 0-100, the weighted average of the required facets only, using weights \
skills 0.40, experience 0.30, education 0.15, licenses 0.15 renormalized over the required ones.\n\
- \"matched\": a list of {\"name\": <required skill or credential>, \"evidence\": <1-2 sentences \
grounded in the seeker's background>}.\n\
- \"missing\": a list of required skills or credentials the seeker lacks.\n\
- \"domain_mismatch\": true when the seeker's field is unrelated to the posting's field.\n\
- \"rationale\": 1-2 sentences explaining the grade.\n\
If evidence is weak, score cautiously. Respond with {\"results\": [ ... ]}.";

/// Builds the `(system, user)` messages for one batched judge request.
pub fn compose(query: &QueryContext, items: &[ItemContext]) -> Result<(String, String), JudgeError> {
    let payload = json!({
        "seeker": query,
        "postings": items,
    });
    let user = format!("{}\n\n{}", RUBRIC, serde_json::to_string(&payload)?);
    Ok((SYSTEM_PROMPT.to_string(), user))
}
