//! Search request and result models.

use serde::{Deserialize, Serialize};

use crate::models::{NormalizedSource, SourceType};

/// Which field the query string targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Title,
    Author,
    Doi,
    Keyword,
    Identifier,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Title => "title",
            QueryType::Author => "author",
            QueryType::Doi => "doi",
            QueryType::Keyword => "keyword",
            QueryType::Identifier => "identifier",
        }
    }
}

impl Default for QueryType {
    fn default() -> Self {
        QueryType::Keyword
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional result filters
///
/// Carried through the query contract and echoed back in the result. The
/// fetcher does not apply them; callers filter the returned records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_from: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_to: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_type: Vec<SourceType>,

    #[serde(default)]
    pub open_access_only: bool,
}

/// Search query parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Main search query string
    pub query: String,

    #[serde(rename = "type", default)]
    pub query_type: QueryType,

    /// Maximum number of records in the final result
    pub limit: usize,

    #[serde(default)]
    pub offset: usize,

    #[serde(default)]
    pub filters: SearchFilters,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            query_type: QueryType::Keyword,
            limit: 20,
            offset: 0,
            filters: SearchFilters::default(),
        }
    }
}

impl SearchQuery {
    /// Create a new keyword query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the query type
    pub fn query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }

    /// Set the result limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the offset
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the filters
    pub fn filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Outcome of one federated search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Ranked, deduplicated records truncated to `query.limit`
    pub sources: Vec<NormalizedSource>,

    /// Record count after deduplication and before truncation
    pub total_results: usize,

    pub query: SearchQuery,

    /// Providers that were queried, in dispatch order
    pub apis: Vec<String>,

    /// Wall-clock duration of the search in milliseconds
    pub search_time: u64,
}
