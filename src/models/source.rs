//! Canonical record model produced by the normalizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of publication types every provider's vocabulary maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Journal,
    Book,
    Conference,
    Preprint,
    Thesis,
    Website,
    Dataset,
    Other,
}

impl SourceType {
    /// Returns the lowercase identifier used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Journal => "journal",
            SourceType::Book => "book",
            SourceType::Conference => "conference",
            SourceType::Preprint => "preprint",
            SourceType::Thesis => "thesis",
            SourceType::Website => "website",
            SourceType::Dataset => "dataset",
            SourceType::Other => "other",
        }
    }
}

impl Default for SourceType {
    fn default() -> Self {
        SourceType::Other
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One author of a work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl Author {
    /// Best display name: full name, else "First Last", else last name
    pub fn display_name(&self) -> String {
        if let Some(full) = &self.full_name {
            return full.clone();
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (None, Some(last)) => last.clone(),
            (Some(first), None) => first.clone(),
            (None, None) => String::new(),
        }
    }
}

/// A bibliographic record in the shape every downstream consumer relies on
///
/// Built once by [`crate::normalizer::Normalizer::normalize`]; fields are
/// public for reading but the completeness score is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSource {
    pub id: String,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
    pub arxiv_id: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,

    /// Whitespace-normalized title; never empty in a search result
    pub title: String,
    pub authors: Vec<Author>,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    #[serde(rename = "type")]
    pub source_type: SourceType,

    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub publisher: Option<String>,

    pub url: Option<String>,
    pub pdf_url: Option<String>,
    pub is_open_access: Option<bool>,

    pub r#abstract: Option<String>,
    pub keywords: Vec<String>,
    pub citation_count: Option<u64>,
    pub impact_factor: Option<f64>,

    /// Weighted field-presence score in `[0, 1]`
    pub completeness: f64,
    /// Provider the record came from
    pub source_api: String,
    pub fetched_at: DateTime<Utc>,
}

impl NormalizedSource {
    /// DOI if available, else the record id
    pub fn primary_id(&self) -> &str {
        self.doi.as_deref().unwrap_or(&self.id)
    }

    /// Author display names joined with "; "
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(Author::display_name)
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
