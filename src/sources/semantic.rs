//! Semantic Scholar provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, hoist, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

const PAPER_FIELDS: &str = "paperId,externalIds,title,abstract,venue,year,publicationDate,\
authors,citationCount,isOpenAccess,openAccessPdf,publicationTypes,journal,fieldsOfStudy,url";

/// Semantic Scholar provider
///
/// Uses the Graph API. Author search resolves the author id first, then lists
/// that author's papers. An API key, when configured, is sent as `x-api-key`.
#[derive(Debug)]
pub struct SemanticScholarProvider {
    gateway: NetworkGateway,
}

impl SemanticScholarProvider {
    pub const NAME: &'static str = "semantic_scholar";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, SEMANTIC_API_BASE).requests_per_second(1.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        format!(
            "{}{}?{}",
            self.gateway.config().base_url,
            endpoint,
            query_string(params)
        )
    }

    /// GET with the API key header when configured
    async fn fetch(&self, url: &str) -> ApiResponse<Payload> {
        let api_key = self.gateway.config().api_key.clone();
        self.gateway
            .send(ParseAs::Json, |client| {
                let builder = client.get(url);
                match api_key.as_deref() {
                    Some(key) => builder.header("x-api-key", key),
                    None => builder,
                }
            })
            .await
    }

    async fn paper_search(&self, query: &str, limit: usize) -> ApiResponse<Payload> {
        let limit = limit.to_string();
        let url = self.build_url(
            "/paper/search",
            &[("query", query), ("limit", limit.as_str()), ("fields", PAPER_FIELDS)],
        );
        self.fetch(&url).await
    }
}

#[async_trait]
impl ProviderClient for SemanticScholarProvider {
    fn display_name(&self) -> &str {
        "Semantic Scholar"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.paper_search(title, limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        let url = self.build_url(
            "/author/search",
            &[("query", author), ("limit", "1"), ("fields", "authorId,name")],
        );
        let lookup = self.fetch(&url).await;

        let author_id = match &lookup.result {
            Ok(payload) => payload
                .as_json()
                .and_then(|v| v.pointer("/data/0/authorId"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(_) => return lookup,
        };
        let Some(author_id) = author_id else {
            tracing::debug!(author, "no semantic scholar author matched");
            return ApiResponse::success(self.name(), Payload::Json(serde_json::json!({"data": []})));
        };

        let limit = limit.to_string();
        let url = self.build_url(
            &format!("/author/{}/papers", urlencoding::encode(&author_id)),
            &[("limit", limit.as_str()), ("fields", PAPER_FIELDS)],
        );
        self.fetch(&url).await
    }

    async fn search_by_doi(&self, doi: &str, _limit: usize) -> ApiResponse<Payload> {
        let url = self.build_url(
            &format!("/paper/DOI:{}", clean_doi(doi)),
            &[("fields", PAPER_FIELDS)],
        );
        self.fetch(&url).await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.paper_search(keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        let mut papers = records_at(payload, "/data");
        if papers.is_empty()
            && payload
                .as_json()
                .and_then(|v| v.get("paperId"))
                .is_some()
        {
            papers = records_at(payload, "");
        }

        papers.into_iter().map(flatten_paper).collect()
    }
}

fn flatten_paper(paper: Value) -> Value {
    let mut paper = hoist(paper, "externalIds");

    // A paper's journal object carries volume and pages; its name beats the venue string
    if let Some(journal) = paper.get("journal").and_then(Value::as_object).cloned() {
        for key in ["volume", "pages"] {
            if let Some(value) = journal.get(key).cloned() {
                set_field(&mut paper, key, value);
            }
        }
    }
    let venue = paper
        .get("venue")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let has_journal_name = paper
        .pointer("/journal/name")
        .and_then(Value::as_str)
        .is_some();
    if let (false, Some(venue)) = (has_journal_name, venue) {
        set_field(&mut paper, "journal", venue);
    }
    paper
}
