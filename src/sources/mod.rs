//! Provider clients for the external bibliographic databases.
//!
//! This module defines the [`ProviderClient`] trait that every provider
//! implements. A provider builds its own URL and query dialect for each of the
//! four search operations, sends it through its [`NetworkGateway`], and turns
//! whatever comes back into loosely-typed intermediate records with
//! [`ProviderClient::transform_response`]. The normalizer takes it from there.
//!
//! # Feature Flags
//!
//! Individual providers can be disabled at compile time using Cargo features
//! (all enabled by default):
//!
//! - `crossref`, `pubmed`, `arxiv`, `semantic_scholar`, `openalex`
//! - `core_repo`, `europe_pmc`, `doaj`, `biorxiv`, `datacite`
//! - `zenodo`, `base`, `plos`, `opencitations`
//!
//! # Feature Groups
//!
//! - `biomedical` - pubmed, europe_pmc, biorxiv
//! - `preprints` - arxiv, biorxiv
//! - `full` - All providers (default)
//!
//! # Runtime Provider Selection
//!
//! All compiled providers are registered. Use the `[fetcher]` section of the
//! configuration (or `--prefer` / `--exclude` on the command line) to narrow
//! the set used for a search:
//!
//! ```toml
//! [fetcher]
//! preferred_apis = ["crossref", "openalex"]
//! excluded_apis = ["base"]
//! ```

#[cfg(feature = "source-arxiv")]
mod arxiv;
#[cfg(feature = "source-base")]
mod base;
#[cfg(feature = "source-biorxiv")]
mod biorxiv;
#[cfg(feature = "source-core-repo")]
mod core;
#[cfg(feature = "source-crossref")]
mod crossref;
#[cfg(feature = "source-datacite")]
mod datacite;
#[cfg(feature = "source-doaj")]
mod doaj;
#[cfg(feature = "source-europe_pmc")]
mod europe_pmc;
#[cfg(feature = "source-openalex")]
mod openalex;
#[cfg(feature = "source-opencitations")]
mod opencitations;
#[cfg(feature = "source-plos")]
mod plos;
#[cfg(feature = "source-pubmed")]
mod pubmed;
mod registry;
#[cfg(feature = "source-semantic_scholar")]
mod semantic;
#[cfg(feature = "source-zenodo")]
mod zenodo;

pub mod mock;

#[cfg(feature = "source-arxiv")]
pub use arxiv::ArxivProvider;
#[cfg(feature = "source-base")]
pub use base::BaseProvider;
#[cfg(feature = "source-biorxiv")]
pub use biorxiv::BiorxivProvider;
#[cfg(feature = "source-core-repo")]
pub use self::core::CoreProvider;
#[cfg(feature = "source-crossref")]
pub use crossref::CrossRefProvider;
#[cfg(feature = "source-datacite")]
pub use datacite::DataCiteProvider;
#[cfg(feature = "source-doaj")]
pub use doaj::DoajProvider;
#[cfg(feature = "source-europe_pmc")]
pub use europe_pmc::EuropePmcProvider;
#[cfg(feature = "source-openalex")]
pub use openalex::OpenAlexProvider;
#[cfg(feature = "source-opencitations")]
pub use opencitations::OpenCitationsProvider;
#[cfg(feature = "source-plos")]
pub use plos::PlosProvider;
#[cfg(feature = "source-pubmed")]
pub use pubmed::PubMedProvider;
#[cfg(feature = "source-semantic_scholar")]
pub use semantic::SemanticScholarProvider;
#[cfg(feature = "source-zenodo")]
pub use zenodo::ZenodoProvider;

pub use mock::StubProvider;
pub use registry::{ProviderCapabilities, ProviderRegistry};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::models::QueryType;
use crate::utils::{ApiConfig, ApiMetrics, ApiResponse, NetworkGateway, Payload};

/// The capability interface every provider implements.
///
/// # Implementing a New Provider
///
/// 1. Create a struct owning a [`NetworkGateway`]
/// 2. Implement `display_name`, `gateway` and `capabilities`
/// 3. Override the search operations the provider supports; the defaults
///    report `"<capability> not supported"`
/// 4. Override `transform_response` to unwrap the provider's envelope
/// 5. Register it in [`ProviderRegistry::from_config`]
#[async_trait]
pub trait ProviderClient: Send + Sync + std::fmt::Debug {
    /// Registry key, e.g. "crossref"
    fn name(&self) -> &str {
        self.gateway().name()
    }

    /// Human-readable name
    fn display_name(&self) -> &str;

    /// The gateway all of this provider's requests go through
    fn gateway(&self) -> &NetworkGateway;

    /// Which query types this provider can answer
    fn capabilities(&self) -> ProviderCapabilities;

    fn supports(&self, query_type: QueryType) -> bool {
        self.capabilities()
            .contains(ProviderCapabilities::for_query_type(query_type))
    }

    async fn search_by_title(&self, _title: &str, _limit: usize) -> ApiResponse<Payload> {
        ApiResponse::unsupported(self.name(), "search by title")
    }

    async fn search_by_author(&self, _author: &str, _limit: usize) -> ApiResponse<Payload> {
        ApiResponse::unsupported(self.name(), "search by author")
    }

    async fn search_by_doi(&self, _doi: &str, _limit: usize) -> ApiResponse<Payload> {
        ApiResponse::unsupported(self.name(), "search by DOI")
    }

    async fn search_by_keyword(&self, _keyword: &str, _limit: usize) -> ApiResponse<Payload> {
        ApiResponse::unsupported(self.name(), "search by keyword")
    }

    /// Unwrap a raw payload into intermediate records using provider field names
    ///
    /// Must not fail: missing optional fields stay absent. The default passes
    /// JSON arrays through element-wise and a single object as one record.
    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        passthrough(payload)
    }

    fn config(&self) -> &ApiConfig {
        self.gateway().config()
    }

    fn metrics(&self) -> ApiMetrics {
        self.gateway().metrics()
    }
}

/// Raw payload as records, without provider-specific unwrapping
pub fn passthrough(payload: &Payload) -> Vec<Value> {
    match payload {
        Payload::Json(Value::Array(items)) => items.clone(),
        Payload::Json(value @ Value::Object(_)) => vec![value.clone()],
        _ => Vec::new(),
    }
}

/// Strip resolver prefixes from a DOI
pub(crate) fn clean_doi(doi: &str) -> String {
    let doi = doi.trim();
    let lower = doi.to_lowercase();
    for prefix in [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi:",
    ] {
        if lower.starts_with(prefix) {
            return doi[prefix.len()..].trim().to_string();
        }
    }
    doi.to_string()
}

/// URL-encoded `k=v&k=v` query string
pub(crate) fn query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Records found at a JSON pointer such as `/message/items`
///
/// An object at the pointer counts as a single record; anything else yields none.
pub(crate) fn records_at(payload: &Payload, pointer: &str) -> Vec<Value> {
    match payload.as_json().and_then(|v| v.pointer(pointer)) {
        Some(Value::Array(items)) => items.clone(),
        Some(value @ Value::Object(_)) => vec![value.clone()],
        _ => Vec::new(),
    }
}

/// Copy the members of the nested object `key` to the top level
///
/// Existing top-level members win.
pub(crate) fn hoist(mut record: Value, key: &str) -> Value {
    let nested = record.get(key).and_then(Value::as_object).cloned();
    if let (Some(nested), Some(top)) = (nested, record.as_object_mut()) {
        for (k, v) in nested {
            top.entry(k).or_insert(v);
        }
    }
    record
}

/// Set `key` on an object record, leaving non-objects untouched
pub(crate) fn set_field(record: &mut Value, key: &str, value: impl Into<Value>) {
    if let Some(map) = record.as_object_mut() {
        map.insert(key.to_string(), value.into());
    }
}

/// Errors a provider call can end in
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The call did not complete within its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Transport failure (DNS, connection reset, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed or unexpected payload
    #[error("Parse error: {0}")]
    Parse(String),

    /// The provider cannot answer this query type
    #[error("{0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(format!("JSON: {}", err))
    }
}
