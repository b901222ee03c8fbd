//! Conversion of provider records into [`NormalizedSource`].
//!
//! Providers hand over loosely-typed JSON objects using their own field
//! names. The normalizer tries a list of fallbacks for every field
//! (camelCase, snake_case, PascalCase and a few provider-specific nested
//! paths), parses authors, maps publication types onto the closed
//! [`SourceType`] set and scores completeness once.
//!
//! ```rust
//! use research_federation::normalizer::Normalizer;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "title": "  Attention   Is All\nYou Need ",
//!     "authors": ["Vaswani, Ashish"],
//!     "year": 2017,
//! });
//! let source = Normalizer::new().normalize(&raw, "semantic_scholar").unwrap();
//! assert_eq!(source.title, "Attention Is All You Need");
//! assert_eq!(source.publication_year, Some(2017));
//! ```

mod authors;
mod completeness;
mod fields;
mod kind;

pub use completeness::completeness;
pub use kind::normalize_type;

use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::models::{NormalizedSource, SourceType};
use crate::sources::clean_doi;
use authors::normalize_authors;
use fields::{
    collapse_whitespace, extract_year, first_bool, first_f64, first_text, first_u64, first_value,
    string_list, strip_markup, Record,
};

static SYNTHETIC_IDS: AtomicU64 = AtomicU64::new(0);

const ID_KEYS: &[&str] = &["id", "ID", "Id", "paperId", "paper_id", "uid", "identifier"];
const DOI_KEYS: &[&str] = &["doi", "DOI", "Doi", "externalIds.DOI", "ids.doi", "dcdoi"];
const PMID_KEYS: &[&str] = &["pmid", "PMID", "pubmed_id", "externalIds.PubMed", "ids.pmid"];
const PMCID_KEYS: &[&str] = &["pmcid", "PMCID", "pmc_id", "externalIds.PubMedCentral", "ids.pmcid"];
const ARXIV_KEYS: &[&str] = &["arxivId", "arxiv_id", "arXivId", "externalIds.ArXiv"];
const ISBN_KEYS: &[&str] = &["isbn", "ISBN", "isbns"];
const ISSN_KEYS: &[&str] = &["issn", "ISSN", "eissn", "issns"];
const TITLE_KEYS: &[&str] = &["title", "Title", "TITLE", "dctitle", "title_display", "display_name"];
const AUTHOR_KEYS: &[&str] = &[
    "authors",
    "author",
    "Authors",
    "AuthorList",
    "authorList.author",
    "authorships",
    "creators",
    "contributors",
    "dcperson",
    "author_display",
];
const YEAR_KEYS: &[&str] = &[
    "publicationYear",
    "publication_year",
    "year",
    "Year",
    "pubYear",
    "published",
    "issued",
    "published-print",
    "published-online",
    "publicationDate",
    "publication_date",
    "publishedDate",
    "published_date",
    "pubdate",
    "pub_date",
    "firstPublicationDate",
    "date",
    "created",
];
const DATE_KEYS: &[&str] = &[
    "publicationDate",
    "publication_date",
    "publishedDate",
    "published_date",
    "firstPublicationDate",
    "pubdate",
    "pub_date",
    "date",
];
const TYPE_KEYS: &[&str] = &[
    "type",
    "Type",
    "pubType",
    "pubtype",
    "publicationType",
    "publication_type",
    "publicationTypes",
    "documentType",
    "document_type",
    "resource_type",
    "types.resourceTypeGeneral",
    "genre",
];
const JOURNAL_KEYS: &[&str] = &[
    "journal",
    "Journal",
    "journalTitle",
    "journal_title",
    "fulljournalname",
    "container-title",
    "container_title",
    "venue",
    "publicationVenue.name",
    "primary_location.source.display_name",
    "journalInfo.journal.title",
];
const VOLUME_KEYS: &[&str] = &["volume", "Volume", "journal.volume", "biblio.volume", "journalInfo.volume"];
const ISSUE_KEYS: &[&str] = &["issue", "Issue", "biblio.issue", "journalInfo.issue"];
const PAGES_KEYS: &[&str] = &["pages", "Pages", "page", "pageInfo", "journal.pages"];
const PUBLISHER_KEYS: &[&str] = &["publisher", "Publisher", "dcpublisher"];
const URL_KEYS: &[&str] = &["url", "URL", "link", "landingPageUrl", "html_url", "links.html", "dclink"];
const PDF_KEYS: &[&str] = &[
    "pdfUrl",
    "pdf_url",
    "pdfURL",
    "openAccessPdf.url",
    "best_oa_location.pdf_url",
    "downloadUrl",
];
const OPEN_ACCESS_KEYS: &[&str] = &[
    "isOpenAccess",
    "is_open_access",
    "openAccess",
    "is_oa",
    "open_access.is_oa",
];
const ABSTRACT_KEYS: &[&str] = &[
    "abstract",
    "Abstract",
    "abstractText",
    "abstract_text",
    "description",
    "summary",
    "dcdescription",
];
const KEYWORD_KEYS: &[&str] = &[
    "keywords",
    "Keywords",
    "keyword",
    "subjects",
    "subject",
    "fieldsOfStudy",
    "dcsubject",
];
const CITATION_KEYS: &[&str] = &[
    "citationCount",
    "citation_count",
    "citedByCount",
    "cited_by_count",
    "is-referenced-by-count",
    "citations",
];
const IMPACT_KEYS: &[&str] = &["impactFactor", "impact_factor"];

/// The single record-level normalization failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{provider}: expected a JSON object, found {found}")]
    NotAnObject {
        provider: String,
        found: &'static str,
    },
}

/// Converts intermediate provider records into [`NormalizedSource`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one intermediate record from `provider`
    ///
    /// Only a non-object value is rejected. Any object, including an empty
    /// one, yields a record with completeness in `[0, 1]`; callers decide
    /// whether an empty title is acceptable.
    pub fn normalize(
        &self,
        raw: &Value,
        provider: &str,
    ) -> Result<NormalizedSource, NormalizeError> {
        let record = raw.as_object().ok_or_else(|| NormalizeError::NotAnObject {
            provider: provider.to_string(),
            found: kind_of(raw),
        })?;

        let doi = first_text(record, DOI_KEYS)
            .map(|d| clean_doi(&d))
            .filter(|d| !d.is_empty());
        let title = first_text(record, TITLE_KEYS)
            .map(|t| collapse_whitespace(&t))
            .unwrap_or_default();
        let publication_year = YEAR_KEYS
            .iter()
            .find_map(|key| fields::lookup(record, key).and_then(extract_year));
        let source_type = first_text(record, TYPE_KEYS)
            .map(|t| normalize_type(&t))
            .unwrap_or(SourceType::Other);

        let pmid = first_text(record, PMID_KEYS);

        let id = first_text(record, ID_KEYS)
            .or_else(|| doi.clone())
            .or_else(|| pmid.as_ref().map(|pmid| format!("pmid:{}", pmid)))
            .unwrap_or_else(|| synthesize_id(provider, &title, publication_year));

        let mut source = NormalizedSource {
            id,
            doi,
            pmid,
            pmcid: first_text(record, PMCID_KEYS),
            arxiv_id: first_text(record, ARXIV_KEYS),
            isbn: first_text(record, ISBN_KEYS),
            issn: first_text(record, ISSN_KEYS),
            title,
            authors: normalize_authors(first_value(record, AUTHOR_KEYS)),
            publication_year,
            publication_date: first_text(record, DATE_KEYS),
            source_type,
            journal: first_text(record, JOURNAL_KEYS).map(|j| collapse_whitespace(&j)),
            volume: first_text(record, VOLUME_KEYS),
            issue: first_text(record, ISSUE_KEYS),
            pages: first_text(record, PAGES_KEYS),
            publisher: first_text(record, PUBLISHER_KEYS),
            url: first_text(record, URL_KEYS),
            pdf_url: first_text(record, PDF_KEYS),
            is_open_access: first_bool(record, OPEN_ACCESS_KEYS),
            r#abstract: first_text(record, ABSTRACT_KEYS)
                .map(|a| strip_markup(&a))
                .filter(|a| !a.is_empty()),
            keywords: keywords(record),
            citation_count: first_u64(record, CITATION_KEYS),
            impact_factor: first_f64(record, IMPACT_KEYS),
            completeness: 0.0,
            source_api: provider.to_string(),
            fetched_at: Utc::now(),
        };
        source.completeness = completeness(&source);

        Ok(source)
    }

    /// Collapse duplicates across providers; see [`crate::utils::deduplicate`]
    pub fn deduplicate(&self, sources: Vec<NormalizedSource>) -> Vec<NormalizedSource> {
        crate::utils::deduplicate(sources)
    }
}

fn keywords(record: &Record) -> Vec<String> {
    first_value(record, KEYWORD_KEYS)
        .map(string_list)
        .unwrap_or_default()
}

fn synthesize_id(provider: &str, title: &str, year: Option<i32>) -> String {
    let seed = match year {
        Some(year) => format!("{}{}", title, year),
        None => title.to_string(),
    };
    let digest = md5::compute(seed.as_bytes());
    let n = SYNTHETIC_IDS.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{:x}-{}-{}",
        provider,
        digest,
        Utc::now().timestamp_millis(),
        n
    )
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
