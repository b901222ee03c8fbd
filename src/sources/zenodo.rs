//! Zenodo provider.
//!
//! API documentation: <https://developers.zenodo.org>

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, hoist, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const ZENODO_API_BASE: &str = "https://zenodo.org/api";

/// Zenodo research repository
///
/// Free and requires no API key.
#[derive(Debug)]
pub struct ZenodoProvider {
    gateway: NetworkGateway,
}

impl ZenodoProvider {
    pub const NAME: &'static str = "zenodo";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, ZENODO_API_BASE).requests_per_second(2.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    async fn records(&self, q: &str, limit: usize) -> ApiResponse<Payload> {
        let size = limit.to_string();
        let url = format!(
            "{}/records?{}",
            self.gateway.config().base_url,
            query_string(&[("q", q), ("size", size.as_str())])
        );
        self.gateway.get(&url, ParseAs::Json).await
    }
}

#[async_trait]
impl ProviderClient for ZenodoProvider {
    fn display_name(&self) -> &str {
        "Zenodo"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.records(&format!("title:\"{}\"", title), limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.records(&format!("creators.name:\"{}\"", author), limit)
            .await
    }

    async fn search_by_doi(&self, doi: &str, limit: usize) -> ApiResponse<Payload> {
        self.records(&format!("doi:\"{}\"", clean_doi(doi)), limit)
            .await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.records(keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        records_at(payload, "/hits/hits")
            .into_iter()
            .map(flatten_record)
            .collect()
    }
}

fn flatten_record(record: Value) -> Value {
    let mut record = hoist(record, "metadata");
    let at = |r: &Value, p: &str| r.pointer(p).cloned().filter(|v| !v.is_null());

    let kind = at(&record, "/resource_type/subtype").or_else(|| at(&record, "/resource_type/type"));
    let open = record
        .get("access_right")
        .and_then(Value::as_str)
        .map(|right| right == "open");

    for (key, value) in [
        ("type", kind),
        ("url", at(&record, "/links/html")),
        ("journal", at(&record, "/journal/title")),
        ("volume", at(&record, "/journal/volume")),
        ("issue", at(&record, "/journal/issue")),
        ("pages", at(&record, "/journal/pages")),
        ("isOpenAccess", open.map(Value::Bool)),
    ] {
        if let Some(value) = value {
            set_field(&mut record, key, value);
        }
    }
    record
}
