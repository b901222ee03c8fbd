//! DOAJ (Directory of Open Access Journals) provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, hoist, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const DOAJ_API_BASE: &str = "https://doaj.org/api";

/// DOAJ article search
#[derive(Debug)]
pub struct DoajProvider {
    gateway: NetworkGateway,
}

impl DoajProvider {
    pub const NAME: &'static str = "doaj";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, DOAJ_API_BASE).requests_per_second(2.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    /// The query is a path segment in DOAJ's API
    async fn search(&self, query: &str, limit: usize) -> ApiResponse<Payload> {
        let page_size = limit.to_string();
        let url = format!(
            "{}/search/articles/{}?{}",
            self.gateway.config().base_url,
            urlencoding::encode(query),
            query_string(&[("pageSize", page_size.as_str())])
        );
        self.gateway.get(&url, ParseAs::Json).await
    }
}

#[async_trait]
impl ProviderClient for DoajProvider {
    fn display_name(&self) -> &str {
        "DOAJ"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("bibjson.title:\"{}\"", title), limit)
            .await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("bibjson.author.name:\"{}\"", author), limit)
            .await
    }

    async fn search_by_doi(&self, doi: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("doi:\"{}\"", clean_doi(doi)), limit)
            .await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        records_at(payload, "/results")
            .into_iter()
            .map(flatten_article)
            .collect()
    }
}

fn flatten_article(article: Value) -> Value {
    let mut article = hoist(article, "bibjson");

    let find_in = |list: &str, kind: &str, field: &str| -> Option<Value> {
        article
            .get(list)
            .and_then(Value::as_array)
            .and_then(|items| {
                items
                    .iter()
                    .find(|i| i.get("type").and_then(Value::as_str) == Some(kind))
            })
            .and_then(|i| i.get(field))
            .cloned()
    };
    let doi = find_in("identifier", "doi", "id");
    let url = find_in("link", "fulltext", "url");
    let issue = article.pointer("/journal/number").cloned();
    let publisher = article.pointer("/journal/publisher").cloned();
    let pages = match (
        article.get("start_page").and_then(Value::as_str),
        article.get("end_page").and_then(Value::as_str),
    ) {
        (Some(start), Some(end)) => Some(format!("{}-{}", start, end)),
        (Some(start), None) => Some(start.to_string()),
        _ => None,
    };

    for (key, value) in [
        ("doi", doi),
        ("url", url),
        ("issue", issue),
        ("publisher", publisher),
        ("pages", pages.map(Value::String)),
    ] {
        if let Some(value) = value {
            set_field(&mut article, key, value);
        }
    }
    set_field(&mut article, "type", "journal-article");
    set_field(&mut article, "isOpenAccess", true);
    article
}
