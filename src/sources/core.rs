//! CORE provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const CORE_API_BASE: &str = "https://api.core.ac.uk/v3";

/// CORE open access aggregator
///
/// Uses the v3 `search/works` endpoint. The API key, when configured, goes
/// in a bearer `Authorization` header.
#[derive(Debug)]
pub struct CoreProvider {
    gateway: NetworkGateway,
}

impl CoreProvider {
    pub const NAME: &'static str = "core";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, CORE_API_BASE).requests_per_second(2.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    async fn search(&self, q: &str, limit: usize) -> ApiResponse<Payload> {
        let limit = limit.to_string();
        let url = format!(
            "{}/search/works?{}",
            self.gateway.config().base_url,
            query_string(&[("q", q), ("limit", limit.as_str())])
        );
        let api_key = self.gateway.config().api_key.clone();

        self.gateway
            .send(ParseAs::Json, |client| {
                let builder = client.get(&url);
                match api_key.as_deref() {
                    Some(key) => builder.bearer_auth(key),
                    None => builder,
                }
            })
            .await
    }
}

#[async_trait]
impl ProviderClient for CoreProvider {
    fn display_name(&self) -> &str {
        "CORE"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("title:\"{}\"", title), limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("authors:\"{}\"", author), limit).await
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
            .map(|mut work| {
                let journal = work.pointer("/journals/0/title").cloned();
                if let Some(journal) = journal {
                    set_field(&mut work, "journal", journal);
                }

                let display = work
                    .get("links")
                    .and_then(Value::as_array)
                    .and_then(|links| {
                        links
                            .iter()
                            .find(|l| l.get("type").and_then(Value::as_str) == Some("display"))
                    })
                    .and_then(|l| l.get("url"))
                    .cloned();
                if let Some(url) = display {
                    set_field(&mut work, "url", url);
                }

                let oa = work.get("downloadUrl").and_then(Value::as_str).is_some();
                if oa {
                    set_field(&mut work, "isOpenAccess", true);
                }
                work
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(base_url: &str) -> CoreProvider {
        CoreProvider::new(
            CoreProvider::default_config()
                .base_url(base_url)
                .requests_per_second(0.0)
                .api_key(Some("core-key".to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_transform_results() {
        let payload = Payload::Json(json!({
            "totalHits": 1,
            "results": [{
                "id": 12345,
                "title": "Open access in practice",
                "authors": [{"name": "Suber, Peter"}],
                "yearPublished": 2012,
                "doi": "10.7551/mitpress/9286.001.0001",
                "journals": [{"title": "MIT Press Essential Knowledge"}],
                "downloadUrl": "https://core.ac.uk/download/12345.pdf",
                "links": [
                    {"type": "download", "url": "https://core.ac.uk/download/12345.pdf"},
                    {"type": "display", "url": "https://core.ac.uk/works/12345"}
                ]
            }]
        }));

        let records = provider("http://localhost").transform_response(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["journal"], "MIT Press Essential Knowledge");
        assert_eq!(records[0]["url"], "https://core.ac.uk/works/12345");
        assert_eq!(records[0]["isOpenAccess"], true);
    }

    #[tokio::test]
    async fn test_bearer_auth_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/works")
            .match_query(mockito::Matcher::UrlEncoded(
                "q".into(),
                "title:\"open access\"".into(),
            ))
            .match_header("authorization", "Bearer core-key")
            .with_status(200)
            .with_body(r#"{"results": []}"#)
            .create_async()
            .await;

        let core = provider(&server.url());
        let response = core.search_by_title("open access", 5).await;

        mock.assert_async().await;
        assert!(response.is_success());
    }
}
