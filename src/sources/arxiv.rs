//! arXiv provider.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::sources::{query_string, ProviderCapabilities, ProviderClient, ProviderError};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const ARXIV_API_BASE: &str = "http://export.arxiv.org/api";

/// arXiv provider
///
/// Queries the Atom export API. arXiv asks clients to stay at one request
/// every three seconds, and it has no DOI lookup.
#[derive(Debug)]
pub struct ArxivProvider {
    gateway: NetworkGateway,
}

impl ArxivProvider {
    pub const NAME: &'static str = "arxiv";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, ARXIV_API_BASE).requests_per_second(0.34)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    async fn query(&self, search_query: &str, limit: usize) -> ApiResponse<Payload> {
        let max_results = limit.to_string();
        let url = format!(
            "{}/query?{}",
            self.gateway.config().base_url,
            query_string(&[
                ("search_query", search_query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
        );
        self.gateway.get(&url, ParseAs::Text).await
    }

    /// Parse an Atom feed into intermediate records
    fn parse_feed(xml: &str) -> Vec<Value> {
        let feed = match feed_rs::parser::parse(xml.as_bytes()) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse arXiv feed");
                return Vec::new();
            }
        };

        feed.entries.iter().map(Self::parse_entry).collect()
    }

    fn parse_entry(entry: &feed_rs::model::Entry) -> Value {
        // Entry ids look like http://arxiv.org/abs/2101.00001v2
        let arxiv_id = entry
            .id
            .rsplit_once("/abs/")
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| entry.id.clone());

        let link_where = |pred: &dyn Fn(&feed_rs::model::Link) -> bool| {
            entry
                .links
                .iter()
                .find(|l| pred(l))
                .map(|l| l.href.clone())
        };
        let url = link_where(&|l| l.rel.as_deref() == Some("alternate"))
            .unwrap_or_else(|| entry.id.clone());
        let pdf_url = link_where(&|l| {
            l.title.as_deref() == Some("pdf") || l.media_type.as_deref() == Some("application/pdf")
        });
        let doi = link_where(&|l| l.title.as_deref() == Some("doi")).map(|href| {
            href.trim_start_matches("http://dx.doi.org/")
                .trim_start_matches("https://doi.org/")
                .to_string()
        });

        let authors: Vec<&str> = entry.authors.iter().map(|a| a.name.as_str()).collect();
        let keywords: Vec<&str> = entry.categories.iter().map(|c| c.term.as_str()).collect();

        json!({
            "id": entry.id,
            "arxivId": arxiv_id,
            "doi": doi,
            "title": entry.title.as_ref().map(|t| t.content.clone()),
            "authors": authors,
            "abstract": entry.summary.as_ref().map(|s| s.content.clone()),
            "publishedDate": entry.published.or(entry.updated).map(|d| d.to_rfc3339()),
            "keywords": keywords,
            "url": url,
            "pdfUrl": pdf_url,
            "type": "preprint",
            "publisher": "arXiv",
            "isOpenAccess": true,
        })
    }
}

#[async_trait]
impl ProviderClient for ArxivProvider {
    fn display_name(&self) -> &str {
        "arXiv"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::TITLE_SEARCH
            | ProviderCapabilities::AUTHOR_SEARCH
            | ProviderCapabilities::KEYWORD_SEARCH
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.query(&format!("ti:\"{}\"", title), limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.query(&format!("au:\"{}\"", author), limit).await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.query(&format!("all:{}", keyword), limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        match payload {
            Payload::Text(xml) => Self::parse_feed(xml),
            Payload::Json(_) => Vec::new(),
        }
    }
}
