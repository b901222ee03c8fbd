//! PLOS (Public Library of Science) provider.
//!
//! The search API is a Solr front end; the article id is the DOI.

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{
    clean_doi, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const PLOS_API_BASE: &str = "https://api.plos.org";

const RETURN_FIELDS: &str =
    "id,title_display,author_display,abstract,journal,publication_date,volume,issue,article_type,subject";

/// PLOS journals search
#[derive(Debug)]
pub struct PlosProvider {
    gateway: NetworkGateway,
}

impl PlosProvider {
    pub const NAME: &'static str = "plos";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, PLOS_API_BASE).requests_per_second(2.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: NetworkGateway::new(config, HttpClient::new()?),
        })
    }

    async fn solr(&self, q: &str, limit: usize) -> ApiResponse<Payload> {
        let rows = limit.to_string();
        let url = format!(
            "{}/search?{}",
            self.gateway.config().base_url,
            query_string(&[
                ("q", q),
                ("wt", "json"),
                ("rows", rows.as_str()),
                ("fl", RETURN_FIELDS),
            ])
        );
        self.gateway.get(&url, ParseAs::Json).await
    }
}

#[async_trait]
impl ProviderClient for PlosProvider {
    fn display_name(&self) -> &str {
        "PLOS"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        self.solr(&format!("title:\"{}\"", title), limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        self.solr(&format!("author:\"{}\"", author), limit).await
    }

    async fn search_by_doi(&self, doi: &str, limit: usize) -> ApiResponse<Payload> {
        self.solr(&format!("id:\"{}\"", clean_doi(doi)), limit).await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.solr(&format!("everything:{}", keyword), limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        records_at(payload, "/response/docs")
            .into_iter()
            .map(|mut doc| {
                let doi = doc.get("id").and_then(Value::as_str).map(str::to_string);
                if let Some(doi) = doi {
                    set_field(
                        &mut doc,
                        "url",
                        format!(
                            "https://journals.plos.org/plosone/article?id={}",
                            urlencoding::encode(&doi)
                        ),
                    );
                    set_field(&mut doc, "doi", doi);
                }
                set_field(&mut doc, "publisher", "Public Library of Science");
                set_field(&mut doc, "isOpenAccess", true);
                doc
            })
            .collect()
    }
}
