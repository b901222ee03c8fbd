//! OpenAlex provider.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::sources::{
    clean_doi, query_string, records_at, set_field, ProviderCapabilities, ProviderClient,
    ProviderError,
};
use crate::utils::{ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload};

const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex provider
///
/// Author search is two calls: `/authors` resolves the name to an author id,
/// then `/works` is filtered by that id.
#[derive(Debug)]
pub struct OpenAlexProvider {
    gateway: NetworkGateway,
}

impl OpenAlexProvider {
    pub const NAME: &'static str = "openalex";

    pub fn default_config() -> ApiConfig {
        ApiConfig::new(Self::NAME, OPENALEX_API_BASE).requests_per_second(10.0)
    }

    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        let http = HttpClient::polite(config.email.as_deref())?;
        Ok(Self {
            gateway: NetworkGateway::new(config, http),
        })
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> ApiResponse<Payload> {
        let mut params = params.to_vec();
        if let Some(email) = self.gateway.config().email.as_deref() {
            params.push(("mailto", email));
        }
        let mut url = format!("{}{}", self.gateway.config().base_url, path);
        if !params.is_empty() {
            url = format!("{}?{}", url, query_string(&params));
        }
        self.gateway.get(&url, ParseAs::Json).await
    }

    async fn works(&self, param: &str, value: &str, limit: usize) -> ApiResponse<Payload> {
        let per_page = limit.to_string();
        self.get("/works", &[(param, value), ("per-page", per_page.as_str())])
            .await
    }
}

#[async_trait]
impl ProviderClient for OpenAlexProvider {
    fn display_name(&self) -> &str {
        "OpenAlex"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> ApiResponse<Payload> {
        // Commas separate filters, so they cannot appear inside the value
        let filter = format!("title.search:{}", title.replace(',', " "));
        self.works("filter", &filter, limit).await
    }

    async fn search_by_author(&self, author: &str, limit: usize) -> ApiResponse<Payload> {
        let lookup = self
            .get("/authors", &[("search", author), ("per-page", "1")])
            .await;

        let author_id = match &lookup.result {
            Ok(payload) => payload
                .as_json()
                .and_then(|v| v.pointer("/results/0/id"))
                .and_then(Value::as_str)
                .map(|id| id.rsplit('/').next().unwrap_or(id).to_string()),
            Err(_) => return lookup,
        };
        let Some(author_id) = author_id else {
            tracing::debug!(author, "no openalex author matched");
            return ApiResponse::success(self.name(), Payload::Json(json!({"results": []})));
        };

        let filter = format!("author.id:{}", author_id);
        self.works("filter", &filter, limit).await
    }

    async fn search_by_doi(&self, doi: &str, _limit: usize) -> ApiResponse<Payload> {
        let path = format!("/works/https://doi.org/{}", clean_doi(doi));
        self.get(&path, &[]).await
    }

    async fn search_by_keyword(&self, keyword: &str, limit: usize) -> ApiResponse<Payload> {
        self.works("search", keyword, limit).await
    }

    fn transform_response(&self, payload: &Payload) -> Vec<Value> {
        let mut works = records_at(payload, "/results");
        if works.is_empty() && payload.as_json().and_then(|v| v.get("id")).is_some() {
            works = records_at(payload, "");
        }
        works.into_iter().map(flatten_work).collect()
    }
}

fn flatten_work(mut work: Value) -> Value {
    if let Some(text) = work
        .get("abstract_inverted_index")
        .and_then(reconstruct_abstract)
    {
        set_field(&mut work, "abstract", text);
    }

    let landing = work
        .pointer("/primary_location/landing_page_url")
        .cloned()
        .filter(|v| !v.is_null());
    if let Some(url) = landing {
        set_field(&mut work, "url", url);
    }

    let pages = match (
        work.pointer("/biblio/first_page").and_then(Value::as_str),
        work.pointer("/biblio/last_page").and_then(Value::as_str),
    ) {
        (Some(first), Some(last)) if first != last => Some(format!("{}-{}", first, last)),
        (Some(first), _) => Some(first.to_string()),
        _ => None,
    };
    if let Some(pages) = pages {
        set_field(&mut work, "pages", pages);
    }

    work
}

/// Rebuild abstract text from OpenAlex's `{word: [positions]}` index
fn reconstruct_abstract(index: &Value) -> Option<String> {
    let index = index.as_object()?;
    let mut positioned: Vec<(u64, &str)> = index
        .iter()
        .flat_map(|(word, positions)| {
            positions
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_u64)
                .map(move |pos| (pos, word.as_str()))
        })
        .collect();
    if positioned.is_empty() {
        return None;
    }
    positioned.sort_by_key(|(pos, _)| *pos);

    Some(
        positioned
            .into_iter()
            .map(|(_, word)| word)
            .collect::<Vec<_>>()
            .join(" "),
    )
}
