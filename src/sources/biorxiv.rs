//! bioRxiv provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, records_at, set_field, ProviderCapabilities, ProviderClient, ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const BIORXIV_API_BASE: &str = "https://api.biorxiv.org";

/// bioRxiv preprint server
///
/// The public API only resolves DOIs; it offers no free-text search.
#[derive(Debug)]
pub struct BiorxivProvider {
    gateway: NetworkGateway,
}

impl BiorxivProvider {
    pub const NAME: &'static str = "biorxiv";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, BIORXIV_API_BASE).requests_per_second(1.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }
}

#[async_trait]
impl ProviderClient for BiorxivProvider {
    fn display_name(&self) -> &str {
        "bioRxiv"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP
    }

    async fn search_by_doi(&self, doi: &str, _limit: usize) -> ApiResponse<Payload> {
        let url = format!(
            "{}/details/biorxiv/{}",
            self.gateway.config().base_url,
            clean_doi(doi)
        );
        self.gateway.get(&url, ParseAs::Json).await
    }

    /// Keeps only the latest version of each preprint
    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        let versions = records_at(payload, "/collection");
        let version_of = |v: &Value| {
            v.get("version")
                .and_then(|n| n.as_str().and_then(|s| s.parse().ok()).or(n.as_u64()))
                .unwrap_or(0u64)
        };

        let mut latest: Vec<Value> = Vec::new();
        for version in versions {
            let doi = version.get("doi").cloned();
            match latest.iter_mut().find(|kept| kept.get("doi").cloned() == doi) {
                Some(kept) if version_of(&version) > version_of(&*kept) => *kept = version,
                Some(_) => {}
                None => latest.push(version),
            }
        }

        latest.into_iter().map(flatten_preprint).collect()
    }
}

fn flatten_preprint(mut preprint: Value) -> Value {
    let landing = match (
        preprint.get("doi").and_then(Value::as_str),
        preprint.get("version"),
    ) {
        (Some(doi), Some(version)) => {
            let version = version
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| version.to_string());
            Some(format!("https://www.biorxiv.org/content/{}v{}", doi, version))
        }
        _ => None,
    };
    if let Some(url) = landing {
        set_field(&mut preprint, "pdfUrl", format!("{}.full.pdf", url));
        set_field(&mut preprint, "url", url);
    }

    let category = preprint.get("category").cloned();
    if let Some(category) = category {
        set_field(&mut preprint, "keywords", category);
    }
    set_field(&mut preprint, "type", "preprint");
    set_field(&mut preprint, "publisher", "bioRxiv");
    set_field(&mut preprint, "isOpenAccess", true);
    preprint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryType;
    use serde_json::json;

    fn provider(base_url: &str) -> BiorxivProvider {
        BiorxivProvider::new(
            BiorxivProvider::default_config()
                .base_url(base_url)
                .requests_per_second(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_latest_version_kept() {
        let payload = Payload::Json(json!({
            "collection": [
                {"doi": "10.1101/339747", "title": "Old", "version": "1",
                 "authors": "Smith, J.; Doe, A.", "date": "2018-06-05", "category": "genomics"},
                {"doi": "10.1101/339747", "title": "New", "version": "2",
                 "authors": "Smith, J.; Doe, A.", "date": "2018-07-01", "category": "genomics"}
            ]
        }));

        let records = provider("http://localhost").transform_response(&payload);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r["title"], "New");
        assert_eq!(r["url"], "https://www.biorxiv.org/content/10.1101/339747v2");
        assert_eq!(r["pdfUrl"], "https://www.biorxiv.org/content/10.1101/339747v2.full.pdf");
        assert_eq!(r["type"], "preprint");
    }

    #[tokio::test]
    async fn test_only_doi_supported() {
        let biorxiv = provider("http://localhost");
        assert!(biorxiv.supports(QueryType::Doi));
        assert!(!biorxiv.supports(QueryType::Keyword));

        let response = biorxiv.search_by_keyword("crispr", 5).await;
        assert_eq!(
            response.error().unwrap().to_string(),
            "search by keyword not supported"
        );
    }

    #[tokio::test]
    async fn test_doi_lookup() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/details/biorxiv/10.1101/339747")
            .with_status(200)
            .with_body(r#"{"collection": [{"doi": "10.1101/339747", "title": "T", "version": "1"}]}"#)
            .create_async()
            .await;

        let biorxiv = provider(&server.url());
        let response = biorxiv.search_by_doi("10.1101/339747", 1).await;

        mock.assert_async().await;
        assert_eq!(biorxiv.transform_response(response.data().unwrap()).len(), 1);
    }
}
