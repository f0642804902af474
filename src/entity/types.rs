use serde::{Deserialize, Serialize};

use crate::facet::RequiredFacets;

/// A job seeker: the query entity of a ranking call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    /// Unique external lookup key (email).
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub licenses: Vec<String>,
    /// Checksum of the text the current vectors were built from.
    pub embedding_checksum: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_experience(mut self, text: impl Into<String>) -> Self {
        self.experience = Some(text.into());
        self
    }

    pub fn with_education(mut self, text: impl Into<String>) -> Self {
        self.education = Some(text.into());
        self
    }

    pub fn with_licenses<I, S>(mut self, licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.licenses = licenses.into_iter().map(Into::into).collect();
        self
    }

    /// Text the vectors are derived from; its checksum tracks freshness.
    pub fn search_document(&self) -> String {
        crate::entity::text::profile_text(self)
    }
}

/// A job posting: a target item ranked for a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub overview: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub licenses: Vec<String>,
    pub location: Option<String>,
    pub seniority: Option<String>,
    pub embedding_checksum: Option<String>,
}

impl Posting {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>, company: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self.company = Some(company.into());
        self
    }

    pub fn with_overview(mut self, text: impl Into<String>) -> Self {
        self.overview = Some(text.into());
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_experience(mut self, text: impl Into<String>) -> Self {
        self.experience = Some(text.into());
        self
    }

    pub fn with_education(mut self, text: impl Into<String>) -> Self {
        self.education = Some(text.into());
        self
    }

    pub fn with_licenses<I, S>(mut self, licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.licenses = licenses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.embedding_checksum = Some(checksum.into());
        self
    }

    /// Education and licenses count as required only when the posting asks for them.
    pub fn required_facets(&self) -> RequiredFacets {
        RequiredFacets {
            education: has_text(&self.education),
            licenses: self.licenses.iter().any(|l| !l.trim().is_empty()),
        }
    }

    pub fn search_document(&self) -> String {
        crate::entity::text::posting_text(self)
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}
