//! Europe PMC provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const EUROPE_PMC_API_BASE: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";

/// Europe PMC provider
#[derive(Debug)]
pub struct EuropePmcProvider {
    gateway: NetworkGateway,
}

impl EuropePmcProvider {
    pub const NAME: &'static str = "europe_pmc";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, EUROPE_PMC_API_BASE).requests_per_second(10.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    async fn search(&self, query: &str, limit: usize) -> ApiResponse<Payload> {
        let page_size = limit.to_string();
        let url = format!(
            "{}/search?{}",
            self.gateway.config().base_url,
            query_string(&[
                ("query", query),
                ("format", "json"),
                ("resultType", "core"),
                ("pageSize", page_size.as_str()),
            ])
        );
        self.gateway.get(&url, ParseAs::Json).await
    }
}

#[async_trait]
impl ProviderClient for EuropePmcProvider {
    fn display_name(&self) -> &str {
        "Europe PMC"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("TITLE:\"{}\"", title), limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("AUTH:\"{}\"", author), limit).await
    }

    async fn search_by_doi(&self, doi: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(&format!("DOI:\"{}\"", clean_doi(doi)), limit)
            .await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.search(keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        records_at(payload, "/resultList/result")
            .into_iter()
            .map(flatten_result)
            .collect()
    }
}

fn flatten_result(mut result: Value) -> Value {
    let pointer = |r: &Value, p: &str| r.pointer(p).cloned().filter(|v| !v.is_null());

    if let Some(kind) = pointer(&result, "/pubTypeList/pubType") {
        set_field(&mut result, "type", kind);
    }
    if let Some(keywords) = pointer(&result, "/keywordList/keyword") {
        set_field(&mut result, "keywords", keywords);
    }
    if let Some(date) = pointer(&result, "/journalInfo/printPublicationDate") {
        if result.get("firstPublicationDate").is_none() {
            set_field(&mut result, "firstPublicationDate", date);
        }
    }

    let pdf = result
        .pointer("/fullTextUrlList/fullTextUrl")
        .and_then(Value::as_array)
        .and_then(|urls| {
            urls.iter()
                .find(|u| u.get("documentStyle").and_then(Value::as_str) == Some("pdf"))
        })
        .and_then(|u| u.get("url"))
        .cloned();
    if let Some(pdf) = pdf {
        set_field(&mut result, "pdfUrl", pdf);
    }

    let landing = match (
        result.get("source").and_then(Value::as_str),
        result.get("id").and_then(Value::as_str),
    ) {
        (Some(source), Some(id)) => Some(format!(
            "https://europepmc.org/article/{}/{}",
            source, id
        )),
        _ => None,
    };
    if let Some(url) = landing {
        set_field(&mut result, "url", url);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(base_url: &str) -> EuropePmcProvider {
        EuropePmcProvider::new(
            EuropePmcProvider::default_config()
                .base_url(base_url)
                .requests_per_second(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_transform_core_result() {
        let payload = Payload::Json(json!({
            "hitCount": 1,
            "resultList": {"result": [{
                "id": "30617335",
                "source": "MED",
                "pmid": "30617335",
                "doi": "10.1038/s41591-018-0300-7",
                "title": "High-performance medicine.",
                "authorList": {"author": [{"fullName": "Topol EJ", "firstName": "Eric J", "lastName": "Topol"}]},
                "journalInfo": {"volume": "25", "issue": "1", "journal": {"title": "Nature medicine"}},
                "pubYear": "2019",
                "isOpenAccess": "N",
                "citedByCount": 2500,
                "pubTypeList": {"pubType": ["review-article", "Journal Article"]},
                "fullTextUrlList": {"fullTextUrl": [
                    {"documentStyle": "doi", "url": "https://doi.org/10.1038/s41591-018-0300-7"},
                    {"documentStyle": "pdf", "url": "https://example.org/paper.pdf"}
                ]}
            }]}
        }));

        let records = provider("http://localhost").transform_response(&payload);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r["type"][0], "review-article");
        assert_eq!(r["pdfUrl"], "https://example.org/paper.pdf");
        assert_eq!(r["url"], "https://europepmc.org/article/MED/30617335");
    }

    #[tokio::test]
    async fn test_doi_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("query".into(), "DOI:\"10.1/x\"".into()),
                mockito::Matcher::UrlEncoded("format".into(), "json".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"resultList": {"result": []}}"#)
            .create_async()
            .await;

        let epmc = provider(&server.url());
        let response = epmc.search_by_doi("doi:10.1/x", 1).await;

        mock.assert_async().await;
        assert!(epmc
            .transform_response(response.data().unwrap())
            .is_empty());
    }
}
