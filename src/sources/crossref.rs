//! CrossRef provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// CrossRef provider
///
/// Uses the CrossRef REST API `works` endpoint. A configured contact email
/// is sent as `mailto` to get into the polite pool.
#[derive(Debug)]
pub struct CrossRefProvider {
    gateway: NetworkGateway,
}

impl CrossRefProvider {
    pub const NAME: &'static str = "crossref";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, CROSSREF_API_BASE).requests_per_second(10.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        let http = HttpClient::polite(config.email.as_deref())?;
        Ok(Self {
            gateway: NetworkGateway::new(config, http),
        })
    }

    async fn works(&self, field: &str, value: &str, limit: usize) -> ApiResponse<Payload> {
        let rows = limit.to_string();
        let mut params = vec![(field, value), ("rows", rows.as_str())];
        if let Some(email) = self.gateway.config().email.as_deref() {
            params.push(("mailto", email));
        }

        let url = format!(
            "{}/works?{}",
            self.gateway.config().base_url,
            query_string(&params)
        );
        self.gateway.get(&url, ParseAs::Json).await
    }
}

#[async_trait]
impl ProviderClient for CrossRefProvider {
    fn display_name(&self) -> &str {
        "CrossRef"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.works("query.bibliographic", title, limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.works("query.author", author, limit).await
    }

    async fn search_by_doi(&self, doi: &str, _limit: usize) -> ApiResponse<Payload> {
        let mut url = format!(
            "{}/works/{}",
            self.gateway.config().base_url,
            urlencoding::encode(&clean_doi(doi))
        );
        if let Some(email) = self.gateway.config().email.as_deref() {
            url = format!("{}?{}", url, query_string(&[("mailto", email)]));
        }
        self.gateway.get(&url, ParseAs::Json).await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.works("query", keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        // Searches nest items under message.items; a DOI lookup returns the work as message
        let mut items = records_at(payload, "/message/items");
        if items.is_empty()
            && payload
                .as_json()
                .and_then(|v| v.pointer("/message/DOI"))
                .is_some()
        {
            items = records_at(payload, "/message");
        }

        items.into_iter().map(with_pdf_link).collect()
    }
}

fn with_pdf_link(mut item: Value) -> Value {
    let pdf = item
        .get("link")
        .and_then(Value::as_array)
        .and_then(|links| {
            links.iter().find(|l| {
                l.get("content-type").and_then(Value::as_str) == Some("application/pdf")
            })
        })
        .and_then(|l| l.get("URL"))
        .cloned();

    if let Some(pdf) = pdf {
        set_field(&mut item, "pdfUrl", pdf);
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(base_url: &str) -> CrossRefProvider {
        CrossRefProvider::new(
            CrossRefProvider::default_config()
                .base_url(base_url)
                .requests_per_second(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_transform_search_items() {
        let payload = Payload::Json(json!({
            "status": "ok",
            "message": {
                "total-results": 2,
                "items": [
                    {"DOI": "10.1/a", "title": ["A"], "link": [
                        {"URL": "https://x/a.pdf", "content-type": "application/pdf"}
                    ]},
                    {"DOI": "10.1/b", "title": ["B"]}
                ]
            }
        }));

        let records = provider("http://localhost").transform_response(&payload);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["pdfUrl"], "https://x/a.pdf");
        assert!(records[1].get("pdfUrl").is_none());
    }

    #[test]
    fn test_transform_single_work() {
        let payload = Payload::Json(json!({
            "message": {"DOI": "10.1/a", "title": ["A"]}
        }));
        let records = provider("http://localhost").transform_response(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["DOI"], "10.1/a");
    }

    #[test]
    fn test_transform_unexpected_shape() {
        let records = provider("http://localhost")
            .transform_response(&Payload::Json(json!({"message": "oops"})));
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_title_search_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("query.bibliographic".into(), "deep learning".into()),
                mockito::Matcher::UrlEncoded("rows".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"message": {"items": [{"DOI": "10.1/a", "title": ["Deep learning"]}]}}"#)
            .create_async()
            .await;

        let crossref = provider(&server.url());
        let response = crossref.search_by_title("deep learning", 3).await;

        mock.assert_async().await;
        let records = crossref.transform_response(response.data().unwrap());
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_doi_lookup_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/works/10\.1038(%2F|/)nature14539$".into()),
            )
            .with_status(200)
            .with_body(r#"{"message": {"DOI": "10.1038/nature14539", "title": ["Deep learning"]}}"#)
            .create_async()
            .await;

        let crossref = provider(&server.url());
        let response = crossref
            .search_by_doi("https://doi.org/10.1038/nature14539", 1)
            .await;

        mock.assert_async().await;
        assert!(response.is_success());
    }
}
