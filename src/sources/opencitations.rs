//! OpenCitations Meta provider.
//!
//! Meta packs several identifiers into one space-separated string and
//! appends bracketed identifiers to names, e.g. `"Peroni, Silvio [orcid:0000-0003-0530-4305]"`.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::sources::{
    clean_doi, passthrough, set_field, ProviderCapabilities, ProviderClient, ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const OPENCITATIONS_API_BASE: &str = "https://api.opencitations.net/meta/v1";

fn bracketed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\[[^\]]*\]").expect("static bracket pattern"))
}

/// OpenCitations Meta bibliographic metadata
///
/// DOI lookup only.
#[derive(Debug)]
pub struct OpenCitationsProvider {
    gateway: NetworkGateway,
}

impl OpenCitationsProvider {
    pub const NAME: &'static str = "opencitations";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, OPENCITATIONS_API_BASE).requests_per_second(2.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }
}

#[async_trait]
impl ProviderClient for OpenCitationsProvider {
    fn display_name(&self) -> &str {
        "OpenCitations"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP
    }

    async fn search_by_doi(&self, doi: &str, _limit: usize) -> ApiResponse<Payload> {
        let url = format!(
            "{}/metadata/doi:{}",
            self.gateway.config().base_url,
            clean_doi(doi)
        );
        self.gateway.get(&url, ParseAs::Json).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        passthrough(payload).into_iter().map(flatten_meta).collect()
    }
}

fn strip_ids(value: &str) -> String {
    bracketed().replace_all(value, "").trim().to_string()
}

fn flatten_meta(mut meta: Value) -> Value {
    let text = |m: &Value, key: &str| {
        m.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    // "doi:10.1/x omid:br/0601 pmid:123"
    let ids = text(&meta, "id").unwrap_or_default();
    let id_of = |scheme: &str| {
        ids.split_whitespace()
            .find_map(|id| id.strip_prefix(scheme).map(str::to_string))
    };
    let doi = id_of("doi:");
    let pmid = id_of("pmid:");
    let omid = id_of("omid:");

    let authors: Option<Vec<Value>> = text(&meta, "author").map(|a| {
        a.split(';')
            .map(strip_ids)
            .filter(|name| !name.is_empty())
            .map(Value::String)
            .collect()
    });

    for (key, value) in [
        ("doi", doi.map(Value::String)),
        ("pmid", pmid.map(Value::String)),
        ("id", omid.map(|o| Value::String(format!("omid:{}", o)))),
        ("authors", authors.map(Value::Array)),
        ("journal", text(&meta, "venue").map(|v| Value::String(strip_ids(&v)))),
        ("publisher", text(&meta, "publisher").map(|p| Value::String(strip_ids(&p)))),
        ("pages", text(&meta, "page").map(Value::String)),
    ] {
        if let Some(value) = value {
            set_field(&mut meta, key, value);
        }
    }
    if let Some(map) = meta.as_object_mut() {
        map.remove("author");
        map.remove("venue");
    }
    meta
}
