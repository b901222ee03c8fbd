//! Stub provider for testing purposes.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::sources::{ProviderCapabilities, ProviderClient, ProviderError};
use crate::utils::{
    ApiConfig, ApiResponse, HttpClient, NetworkGateway, ParseAs, Payload, RetryConfig,
};

#[derive(Debug, Clone)]
enum Behavior {
    Records(Vec<Value>),
    Fail(ProviderError),
    /// Route a request that never completes through the gateway's timeout
    Hang,
}

/// A provider that answers every supported operation with canned data.
///
/// Operations outside its capabilities report `"<capability> not supported"`
/// like the network-backed providers do.
///
/// It owns a real [`NetworkGateway`] with no rate limit, so metrics and the
/// timeout path behave exactly as for network-backed providers.
#[derive(Debug)]
pub struct StubProvider {
    gateway: NetworkGateway,
    capabilities: ProviderCapabilities,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StubProvider {
    /// A stub supporting every query type and returning no records.
    pub fn new(name: &str) -> Self {
        let config = ApiConfig::new(name, "http://127.0.0.1:9")
            .requests_per_second(0.0)
            .retries(0);
        Self {
            gateway: NetworkGateway::new(
                config,
                HttpClient::from_client(Arc::new(reqwest::Client::new())),
            ),
            capabilities: ProviderCapabilities::all(),
            behavior: Behavior::Records(Vec::new()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Return these intermediate records.
    pub fn with_records(mut self, records: Vec<Value>) -> Self {
        self.behavior = Behavior::Records(records);
        self
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.behavior = Behavior::Fail(error);
        self
    }

    /// Never answer; the gateway times the call out after `timeout`.
    pub fn hanging(mut self, timeout: Duration) -> Self {
        self.gateway = NetworkGateway::new(
            self.gateway.config().clone().timeout(timeout),
            self.gateway.http().clone(),
        );
        self.behavior = Behavior::Hang;
        self
    }

    /// Retry transient failures `retries` times with millisecond backoff.
    pub fn with_retries(mut self, retries: u32) -> Self {
        let retry = RetryConfig {
            max_retries: retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        self.gateway = NetworkGateway::new(
            self.gateway.config().clone().retry(retry),
            self.gateway.http().clone(),
        );
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Operations invoked so far, e.g. `["keyword", "doi"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn respond(
        &self,
        operation: &str,
        required: ProviderCapabilities,
        capability: &str,
    ) -> ApiResponse<Payload> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(operation.to_string());

        if !self.capabilities.contains(required) {
            return ApiResponse::unsupported(self.name(), capability);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Records(records) => {
                ApiResponse::success(self.name(), Payload::Json(Value::Array(records.clone())))
            }
            Behavior::Fail(error) => ApiResponse::failure(self.name(), error.clone()),
            Behavior::Hang => {
                let client = self.gateway.http().client().clone();
                let options = self.gateway.default_options(ParseAs::Json);
                self.gateway
                    .execute_request(
                        || {
                            let request = client.get(self.gateway.config().base_url.as_str());
                            async move {
                                tokio::time::sleep(Duration::from_secs(3600)).await;
                                request.send().await
                            }
                        },
                        options,
                    )
                    .await
            }
        }
    }
}

#[async_trait]
impl ProviderClient for StubProvider {
    fn display_name(&self) -> &str {
        "Stub Provider"
    }

    fn gateway(&self) -> &NetworkGateway {
        &self.gateway
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn search_by_title(&self, _title: &str, _limit: usize) -> ApiResponse<Payload> {
        self.respond("title", ProviderCapabilities::TITLE_SEARCH, "search by title")
            .await
    }

    async fn search_by_author(&self, _author: &str, _limit: usize) -> ApiResponse<Payload> {
        self.respond("author", ProviderCapabilities::AUTHOR_SEARCH, "search by author")
            .await
    }

    async fn search_by_doi(&self, _doi: &str, _limit: usize) -> ApiResponse<Payload> {
        self.respond("doi", ProviderCapabilities::DOI_LOOKUP, "search by DOI")
            .await
    }

    async fn search_by_keyword(&self, _keyword: &str, _limit: usize) -> ApiResponse<Payload> {
        self.respond("keyword", ProviderCapabilities::KEYWORD_SEARCH, "search by keyword")
            .await
    }
}

/// Helper to build an intermediate record for stub providers.
pub fn make_record(title: &str, doi: Option<&str>) -> Value {
    let mut record = json!({
        "title": title,
        "authors": ["Doe, Jane"],
    });
    if let Some(doi) = doi {
        record["doi"] = Value::String(doi.to_string());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_calls() {
        let stub = StubProvider::new("stub").with_records(vec![make_record("A", None)]);

        let response = stub.search_by_keyword("x", 10).await;
        let records = stub.transform_response(response.data().unwrap());

        assert_eq!(records.len(), 1);
        assert_eq!(stub.calls(), vec!["keyword"]);
        assert_eq!(response.api_name, "stub");
    }

    #[tokio::test]
    async fn test_operations_outside_capabilities_unsupported() {
        let stub = StubProvider::new("doi-only")
            .with_records(vec![make_record("A", Some("10.1/a"))])
            .with_capabilities(ProviderCapabilities::DOI_LOOKUP);

        let title = stub.search_by_title("x", 10).await;
        assert!(matches!(title.error(), Some(ProviderError::Unsupported(_))));
        assert_eq!(title.error().unwrap().to_string(), "search by title not supported");

        let doi = stub.search_by_doi("10.1/a", 10).await;
        assert!(doi.is_success());
        assert_eq!(stub.calls(), vec!["title", "doi"]);
        assert_eq!(stub.metrics().total_requests, 0);
    }

    #[tokio::test]
    async fn test_hanging_times_out() {
        let stub = StubProvider::new("slow").hanging(Duration::from_millis(20));

        let response = stub.search_by_title("x", 10).await;
        assert!(matches!(response.error(), Some(ProviderError::Timeout(_))));
        assert_eq!(stub.metrics().failed_requests, 1);
    }

    #[tokio::test]
    async fn test_timeouts_are_retried() {
        let stub = StubProvider::new("slow")
            .hanging(Duration::from_millis(10))
            .with_retries(2);

        let response = stub.search_by_keyword("x", 10).await;
        assert!(!response.is_success());
        assert_eq!(stub.metrics().total_requests, 3);
    }
}
