use serde_json::Value;

use super::error::JudgeError;
use super::types::{JudgeVerdict, MatchedAttribute};
use crate::facet::{Facet, FacetScores};

/// Parses a judge reply into verdicts.
///
/// Accepts `{"results": [...]}`, a bare array, or a single verdict object, optionally wrapped in
/// prose or code fences. Entries without an id are skipped; if nothing usable remains, or the
/// reply is not JSON of either shape, the reply is malformed.
pub fn parse_verdicts(text: &str) -> Result<Vec<JudgeVerdict>, JudgeError> {
    let value = extract_json(text).ok_or_else(|| JudgeError::MalformedOutput {
        reason: "no JSON object or array found".to_string(),
    })?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(JudgeError::MalformedOutput {
                    reason: "`results` is not an array".to_string(),
                });
            }
            None => vec![Value::Object(map)],
        },
        _ => {
            return Err(JudgeError::MalformedOutput {
                reason: "expected an object or array".to_string(),
            });
        }
    };

    let verdicts: Vec<JudgeVerdict> = entries.iter().filter_map(verdict_from_value).collect();
    if verdicts.is_empty() {
        return Err(JudgeError::MalformedOutput {
            reason: "no verdict carried an id".to_string(),
        });
    }
    Ok(verdicts)
}

/// Full body first, then the outermost `{...}` slice, then the outermost `[...]` slice.
fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(left), Some(right)) = (text.find(open), text.rfind(close))
            && right > left
            && let Ok(value) = serde_json::from_str::<Value>(&text[left..=right])
        {
            return Some(value);
        }
    }
    None
}

fn verdict_from_value(value: &Value) -> Option<JudgeVerdict> {
    let obj = value.as_object()?;
    let item_id = obj
        .get("id")
        .or_else(|| obj.get("item_id"))
        .and_then(scalar_string)?;

    let mut facet_scores = FacetScores::new();
    if let Some(scores) = obj.get("scores").and_then(Value::as_object) {
        for (key, raw) in scores {
            if let (Ok(facet), Some(score)) = (key.parse::<Facet>(), number(raw)) {
                facet_scores.insert(facet, score);
            }
        }
    }

    let matched = obj
        .get("matched")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(matched_attribute).collect())
        .unwrap_or_default();

    let missing = obj
        .get("missing")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(scalar_string).collect())
        .unwrap_or_default();

    Some(JudgeVerdict {
        item_id,
        facet_scores,
        overall: obj.get("overall").and_then(number),
        matched,
        missing,
        domain_mismatch: obj
            .get("domain_mismatch")
            .map(truthy)
            .unwrap_or(false),
        rationale: obj
            .get("rationale")
            .and_then(Value::as_str)
            .map(trim_to_two_sentences)
            .filter(|r| !r.is_empty()),
    })
}

fn matched_attribute(value: &Value) -> Option<MatchedAttribute> {
    match value {
        Value::Object(obj) => Some(MatchedAttribute {
            name: obj.get("name").and_then(scalar_string)?,
            evidence: obj
                .get("evidence")
                .and_then(Value::as_str)
                .map(trim_to_two_sentences)
                .filter(|e| !e.is_empty()),
        }),
        other => scalar_string(other).map(|name| MatchedAttribute {
            name,
            evidence: None,
        }),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
        _ => false,
    }
}

/// Keeps at most the first two sentences (split after `.`, `!` or `?` followed by whitespace).
pub fn trim_to_two_sentences(text: &str) -> String {
    let text = text.trim();
    let mut sentences: Vec<&str> = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            sentences.push(&text[start..i]);
            while chars.next_if(|(_, n)| n.is_whitespace()).is_some() {}
            start = chars.peek().map(|(j, _)| *j).unwrap_or(text.len());
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    if sentences.len() > 2 {
        sentences[..2].join(" ")
    } else {
        text.to_string()
    }
}
