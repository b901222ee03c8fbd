//! PubMed provider using the NCBI E-utilities API.
//!
//! Every search is two calls: ESearch resolves the query to PMIDs, then
//! ESummary fetches the document summaries for those ids. Both run through
//! the gateway, so both count against the 3 requests/second budget.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::sources::{
    clean_doi, query_string, ProviderCapabilities, ProviderClient, ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const PUBMED_API_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// PubMed provider
#[derive(Debug)]
pub struct PubMedProvider {
    gateway: NetworkGateway,
}

impl PubMedProvider {
    pub const NAME: &'static str = "pubmed";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, PUBMED_API_BASE).requests_per_second(3.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    /// Build an E-utilities URL, adding the contact email and API key when configured
    fn eutils_url(&self, tool: &str, params: &[(&str, &str)]) -> String {
        let config = self.gateway.config();
        let mut params = params.to_vec();
        params.push(("db", "pubmed"));
        params.push(("retmode", "json"));
        if let Some(email) = config.email.as_deref() {
            params.push(("email", email));
        }
        if let Some(key) = config.api_key.as_deref() {
            params.push(("api_key", key));
        }
        format!("{}/{}.fcgi?{}", config.base_url, tool, query_string(&params))
    }

    /// ESearch then ESummary for `term`
    async fn search_term(&self, term: &str, limit: usize) -> ApiResponse<Payload> {
        let retmax = limit.to_string();
        let search_url = self.eutils_url("esearch", &[("term", term), ("retmax", retmax.as_str())]);
        let search = self.gateway.get(&search_url, ParseAs::Json).await;

        let ids = match &search.result {
            Ok(payload) => id_list(payload),
            Err(_) => return search,
        };
        if ids.is_empty() {
            tracing::debug!(term, "pubmed search matched no ids");
            return ApiResponse::success(
                self.name(),
                Payload::Json(json!({"result": {"uids": []}})),
            );
        }

        let joined = ids.join(",");
        let summary_url = self.eutils_url("esummary", &[("id", joined.as_str())]);
        self.gateway.get(&summary_url, ParseAs::Json).await
    }
}

fn id_list(payload: &Payload) -> Vec<String> {
    payload
        .as_json()
        .and_then(|v| v.pointer("/esearchresult/idlist"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ProviderClient for PubMedProvider {
    fn display_name(&self) -> &str {
        "PubMed"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.search_term(&format!("{}[Title]", title), limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.search_term(&format!("{}[Author]", author), limit)
            .await
    }

    async fn search_by_doi(&self, doi: &str, limit: usize) -> ApiResponse<Payload> {
        self.search_term(&format!("{}[DOI]", clean_doi(doi)), limit)
            .await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.search_term(keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        let Some(result) = payload.as_json().and_then(|v| v.get("result")) else {
            return Vec::new();
        };
        let uids = result
            .get("uids")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        uids.iter()
            .filter_map(Value::as_str)
            .filter_map(|uid| result.get(uid).and_then(Value::as_object))
            .map(summary_record)
            .collect()
    }
}

/// Flatten one ESummary document into intermediate field names
fn summary_record(doc: &Map<String, Value>) -> Value {
    let uid = doc.get("uid").and_then(Value::as_str).unwrap_or_default();
    let article_id = |kind: &str| {
        doc.get("articleids")
            .and_then(Value::as_array)
            .and_then(|ids| {
                ids.iter()
                    .find(|id| id.get("idtype").and_then(Value::as_str) == Some(kind))
            })
            .and_then(|id| id.get("value"))
            .cloned()
            .unwrap_or(Value::Null)
    };

    // ESummary names look like "Smith JA": surname first, initials last
    let authors: Vec<Value> = doc
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter(|a| a.get("authtype").and_then(Value::as_str) != Some("CollectiveName"))
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(|name| match name.rsplit_once(' ') {
                    Some((last, initials)) => Value::String(format!("{}, {}", last, initials)),
                    None => Value::String(name.to_string()),
                })
                .collect()
        })
        .unwrap_or_default();

    let field = |key: &str| doc.get(key).cloned().unwrap_or(Value::Null);
    let journal = doc
        .get("fulljournalname")
        .filter(|j| j.as_str().is_some_and(|s| !s.is_empty()))
        .cloned()
        .unwrap_or_else(|| field("source"));

    json!({
        "pmid": uid,
        "doi": article_id("doi"),
        "pmcid": article_id("pmc"),
        "title": field("title"),
        "authors": authors,
        "pubdate": field("pubdate"),
        "journal": journal,
        "volume": field("volume"),
        "issue": field("issue"),
        "pages": field("pages"),
        "issn": field("issn"),
        "type": field("pubtype"),
        "url": format!("https://pubmed.ncbi.nlm.nih.gov/{}/", uid),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const SUMMARY: &str = r#"{
        "result": {
            "uids": ["31452104"],
            "31452104": {
                "uid": "31452104",
                "pubdate": "2019 Aug 26",
                "source": "Nat Med",
                "fulljournalname": "Nature medicine",
                "authors": [
                    {"name": "Topol EJ", "authtype": "Author"},
                    {"name": "CRISPR Consortium", "authtype": "CollectiveName"}
                ],
                "title": "High-performance medicine.",
                "volume": "25",
                "issue": "1",
                "pages": "44-56",
                "pubtype": ["Journal Article", "Review"],
                "articleids": [
                    {"idtype": "pubmed", "value": "31452104"},
                    {"idtype": "doi", "value": "10.1038/s41591-018-0300-7"}
                ]
            }
        }
    }"#;

    fn provider(base_url: &str) -> PubMedProvider {
        PubMedProvider::new(
            PubMedProvider::default_config()
                .base_url(base_url)
                .requests_per_second(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_transform_summary() {
        let payload = Payload::Json(serde_json::from_str(SUMMARY).unwrap());
        let records = provider("http://localhost").transform_response(&payload);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r["pmid"], "31452104");
        assert_eq!(r["doi"], "10.1038/s41591-018-0300-7");
        assert_eq!(r["journal"], "Nature medicine");
        assert_eq!(r["authors"], json!(["Topol, EJ"]));
        assert_eq!(r["url"], "https://pubmed.ncbi.nlm.nih.gov/31452104/");
        assert!(r["pmcid"].is_null());
    }

    #[test]
    fn test_record_without_doi_keeps_pmid_as_id() {
        let payload = Payload::Json(serde_json::from_str(SUMMARY).unwrap());
        let mut record = provider("http://localhost").transform_response(&payload).remove(0);
        record["doi"] = Value::Null;

        let source = crate::normalizer::Normalizer::new()
            .normalize(&record, PubMedProvider::NAME)
            .unwrap();
        assert_eq!(source.id, "pmid:31452104");
        assert_eq!(source.pmid.as_deref(), Some("31452104"));
    }

    #[tokio::test]
    async fn test_two_step_search() {
        let mut server = mockito::Server::new_async().await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("term".into(), "medicine[Title]".into()),
                Matcher::UrlEncoded("retmax".into(), "5".into()),
                Matcher::UrlEncoded("retmode".into(), "json".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "1", "idlist": ["31452104"]}}"#)
            .create_async()
            .await;
        let esummary = server
            .mock("GET", "/esummary.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "31452104".into()))
            .with_status(200)
            .with_body(SUMMARY)
            .create_async()
            .await;

        let pubmed = provider(&server.url());
        let response = pubmed.search_by_title("medicine", 5).await;

        esearch.assert_async().await;
        esummary.assert_async().await;
        let records = pubmed.transform_response(response.data().unwrap());
        assert_eq!(records[0]["title"], "High-performance medicine.");
        assert_eq!(pubmed.metrics().successful_requests, 2);
    }

    #[tokio::test]
    async fn test_no_ids_skips_summary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "0", "idlist": []}}"#)
            .create_async()
            .await;
        let esummary = server
            .mock("GET", "/esummary.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let pubmed = provider(&server.url());
        let response = pubmed.search_by_keyword("nothing", 5).await;

        esummary.assert_async().await;
        assert!(response.is_success());
        assert!(pubmed.transform_response(response.data().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_esearch_failure_is_returned() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(400)
            .create_async()
            .await;

        let pubmed = PubMedProvider::new(
            PubMedProvider::default_config()
                .base_url(server.url())
                .requests_per_second(0.0)
                .retries(0),
        )
        .unwrap();
        let response = pubmed.search_by_author("Topol", 5).await;

        assert!(matches!(
            response.error(),
            Some(ProviderError::HttpStatus { status: 400, .. })
        ));
    }
}
