//! Seeker profiles, job postings, and the text/skill helpers derived from them.
//!
//! - [`types`] holds the row types the engine reads from the relational store.
//! - [`coerce`] turns loosely-typed column values into lists and text.
//! - [`text`] flattens entities into the summaries fed to the reranker.
//! - [`skills`] normalizes skill strings and computes required-skill coverage.

pub mod coerce;
pub mod skills;
pub mod text;
pub mod types;


pub use skills::{SkillAnalysis, analyze_required_vs_profile, normalize_skills};
pub use text::{posting_facet_texts, posting_text, profile_facet_texts, profile_text};
pub use types::{Posting, Profile};
