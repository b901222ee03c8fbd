//! DataCite provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, hoist, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const DATACITE_API_BASE: &str = "https://api.datacite.org";

/// DataCite DOI registry
///
/// Mostly datasets, software and grey literature, with JSON:API envelopes.
#[derive(Debug)]
pub struct DataCiteProvider {
    gateway: NetworkGateway,
}

impl DataCiteProvider {
    pub const NAME: &'static str = "datacite";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, DATACITE_API_BASE).requests_per_second(5.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    async fn search(&self, query: &str, limit: usize) -> ApiResponse<Payload> {
        let size = limit.to_string();
        let url = format!(
            "{}/dois?{}",
            self.gateway.config().base_url,
            query_string(&[("query", query), ("page[size]", size.as_str())])
        );
        self.gateway.get(&url, ParseAs::Json).await
    }
}

#[async_trait]
impl ProviderClient for DataCiteProvider {
    fn display_name(&self) -> &str {
        "DataCite"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("titles.title:\"{}\"", title), limit)
            .await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("creators.name:\"{}\"", author), limit)
            .await
    }

    async fn search_by_doi(&self, doi: &str, _limit: usize) -> ApiResponse<Payload> {
        let url = format!(
            "{}/dois/{}",
            self.gateway.config().base_url,
            urlencoding::encode(&clean_doi(doi))
        );
        self.gateway.get(&url, ParseAs::Json).await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        records_at(payload, "/data")
            .into_iter()
            .map(flatten_doi)
            .collect()
    }
}

fn flatten_doi(record: Value) -> Value {
    let attributes = record.get("attributes").cloned().unwrap_or(Value::Null);
    let mut record = hoist(record, "attributes");
    let at = |p: &str| attributes.pointer(p).cloned().filter(|v| !v.is_null());

    // The JSON:API "type" member is always "dois"; the resource type lives in attributes
    let kind = at("/types/resourceTypeGeneral").or_else(|| at("/types/resourceType"));
    match kind {
        Some(kind) => set_field(&mut record, "type", kind),
        None => {
            if let Some(map) = record.as_object_mut() {
                map.remove("type");
            }
        }
    }

    let description = attributes
        .get("descriptions")
        .and_then(Value::as_array)
        .and_then(|d| {
            d.iter()
                .find(|d| d.get("descriptionType").and_then(Value::as_str) == Some("Abstract"))
                .or_else(|| d.first())
        })
        .and_then(|d| d.get("description"))
        .cloned();
    let subjects: Option<Vec<Value>> = attributes
        .get("subjects")
        .and_then(Value::as_array)
        .map(|s| s.iter().filter_map(|s| s.get("subject").cloned()).collect());
    let pages = match (
        at("/container/firstPage").and_then(|v| v.as_str().map(str::to_string)),
        at("/container/lastPage").and_then(|v| v.as_str().map(str::to_string)),
    ) {
        (Some(first), Some(last)) => Some(Value::String(format!("{}-{}", first, last))),
        (Some(first), None) => Some(Value::String(first)),
        _ => None,
    };

    for (key, value) in [
        ("title", at("/titles/0/title")),
        ("abstract", description),
        ("keywords", subjects.map(Value::Array)),
        ("journal", at("/container/title")),
        ("volume", at("/container/volume")),
        ("issue", at("/container/issue")),
        ("pages", pages),
    ] {
        if let Some(value) = value {
            set_field(&mut record, key, value);
        }
    }
    record
}
