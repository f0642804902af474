//! Cross-cutting, shared constants.
//!
//! Stage defaults live here so config types, tests and the CLI agree on them. Prefer reading
//! values through [`EngineConfig`](crate::ranking::EngineConfig) at runtime.

/// Vector index namespace holding job-seeker facet vectors.
pub const DEFAULT_QUERY_NAMESPACE: &str = "job_seekers";
/// Vector index namespace holding job-posting facet vectors.
pub const DEFAULT_ITEM_NAMESPACE: &str = "job_posts";

/// Separator between entity id and facet in vector ids (`"<entity_id>:<facet>"`).
pub const VECTOR_ID_SEPARATOR: char = ':';

pub const DEFAULT_TOP_K_PER_FACET: u64 = 20;
pub const DEFAULT_MIN_FACETS: usize = 1;

pub const DEFAULT_RERANK_TOP_K: usize = 50;
pub const DEFAULT_RERANK_ALPHA: f64 = 0.65;

pub const DEFAULT_JUDGE_TOP_K: usize = 15;

/// Score assigned to every member of a batch whose raw values are all equal.
pub const FLAT_BATCH_SCORE: f64 = 50.0;

pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 8;

pub const DEFAULT_STALE_ITEM_LIMIT: usize = 200;

/// Rounds to two decimal places (the display precision of every score).
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(12.344_9), 12.34);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(100.0), 100.0);
    }

    #[test]
    fn test_round2_negative() {
        assert_eq!(round2(-1.005_1), -1.01);
    }
}
