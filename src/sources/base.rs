//! BASE (Bielefeld Academic Search Engine) provider.
//!
//! API documentation: <https://www.base-search.net/about/en/about_develop.php>

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::sources::{
    clean_doi, query_string, records_at, ProviderCapabilities, ProviderClient, ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const BASE_API_BASE: &str = "https://api.base-search.net/cgi-bin/BaseHttpSearchInterface.fcgi";

/// Dublin Core field names and their intermediate-record equivalents
const DC_FIELDS: &[(&str, &str)] = &[
    ("dctitle", "title"),
    ("dcperson", "authors"),
    ("dccreator", "authors"),
    ("dcyear", "year"),
    ("dcdate", "publishedDate"),
    ("dcdoi", "doi"),
    ("dclink", "url"),
    ("dcidentifier", "url"),
    ("dcdescription", "abstract"),
    ("dcpublisher", "publisher"),
    ("dcsource", "journal"),
    ("dctype", "type"),
    ("dctypenorm", "type"),
    ("dcsubject", "keywords"),
    ("dcoa", "isOpenAccess"),
];

/// BASE search provider
#[derive(Debug)]
pub struct BaseProvider {
    gateway: NetworkGateway,
}

impl BaseProvider {
    pub const NAME: &'static str = "base";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, BASE_API_BASE).requests_per_second(1.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    async fn perform_search(&self, query: &str, limit: usize) -> ApiResponse<Payload> {
        let hits = limit.to_string();
        let url = format!(
            "{}?{}",
            self.gateway.config().base_url,
            query_string(&[
                ("func", "PerformSearch"),
                ("query", query),
                ("format", "json"),
                ("hits", hits.as_str()),
            ])
        );
        self.gateway.get(&url, ParseAs::Json).await
    }
}

#[async_trait]
impl ProviderClient for BaseProvider {
    fn display_name(&self) -> &str {
        "BASE"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.perform_search(&format!("dctitle:{}", title), limit)
            .await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.perform_search(&format!("dcperson:{}", author), limit)
            .await
    }

    async fn search_by_doi(&self, doi: &str, limit: usize) -> ApiResponse<Payload> {
        self.perform_search(&format!("dcdoi:{}", clean_doi(doi)), limit)
            .await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.perform_search(keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        records_at(payload, "/response/docs")
            .into_iter()
            .filter_map(|doc| doc.as_object().map(rename_dc_fields))
            .collect()
    }
}

/// First mapping wins when two DC fields land on the same key
fn rename_dc_fields(doc: &Map<String, Value>) -> Value {
    let mut record = Map::new();
    for (dc, key) in DC_FIELDS {
        if let Some(value) = doc.get(*dc).filter(|v| !v.is_null()) {
            record.entry(key.to_string()).or_insert_with(|| value.clone());
        }
    }
    // dcoa is 1 for open access, 2 for unknown
    if let Some(oa) = record.get("isOpenAccess").and_then(Value::as_u64) {
        record.insert("isOpenAccess".to_string(), Value::Bool(oa == 1));
    }
    Value::Object(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(base_url: &str) -> BaseProvider {
        BaseProvider::new(
            BaseProvider::default_config()
                .base_url(base_url)
                .requests_per_second(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_dc_fields_renamed() {
        let payload = Payload::Json(json!({
            "response": {"numFound": 1, "docs": [{
                "dctitle": "Repository harvesting at scale",
                "dcperson": ["Schmidt, Anna", "Meyer, Jan"],
                "dcyear": 2016,
                "dcdoi": ["10.1000/base.1"],
                "dclink": "https://pub.uni-bielefeld.de/record/1",
                "dcidentifier": ["https://example.org/other"],
                "dctypenorm": ["121"],
                "dctype": ["Article"],
                "dcoa": 1
            }]}
        }));

        let records = provider("http://localhost").transform_response(&payload);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r["title"], "Repository harvesting at scale");
        assert_eq!(r["authors"][1], "Meyer, Jan");
        assert_eq!(r["url"], "https://pub.uni-bielefeld.de/record/1");
        assert_eq!(r["type"][0], "Article");
        assert_eq!(r["isOpenAccess"], true);
        assert!(r.get("dctitle").is_none());
    }

    #[tokio::test]
    async fn test_perform_search_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("func".into(), "PerformSearch".into()),
                mockito::Matcher::UrlEncoded("query".into(), "dcdoi:10.1/x".into()),
                mockito::Matcher::UrlEncoded("hits".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"response": {"docs": []}}"#)
            .create_async()
            .await;

        let base = provider(&format!("{}/", server.url()));
        let response = base.search_by_doi("https://doi.org/10.1/x", 2).await;

        mock.assert_async().await;
        assert!(response.is_success());
    }
}
