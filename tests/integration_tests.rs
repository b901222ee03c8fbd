//! Integration tests for Research Federation
//!
//! These drive `Fetcher::search` end to end against stub providers.

use research_federation::models::{QueryType, SearchQuery};
use research_federation::sources::mock::make_record;
use research_federation::sources::{ProviderError, ProviderRegistry, StubProvider};
use research_federation::utils::normalize_title;
use research_federation::{Config, Fetcher, FetcherConfig, ProviderClient};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn registry(stubs: Vec<StubProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::empty();
    for stub in stubs {
        registry.register(Arc::new(stub));
    }
    registry
}

fn rich_record(title: &str, doi: Option<&str>) -> serde_json::Value {
    let mut record = make_record(title, doi);
    record["abstract"] = json!("A detailed abstract.");
    record["journal"] = json!("Journal of Tests");
    record["year"] = json!(2021);
    record
}

#[tokio::test]
async fn test_overlapping_providers_merge_and_rank() {
    let first = StubProvider::new("first").with_records(vec![
        make_record("Alpha study", None),
        make_record("Beta study", None),
        make_record("Gamma study", None),
    ]);
    let second = StubProvider::new("second").with_records(vec![
        rich_record("ALPHA   study", None),
        make_record("Beta study!", None),
        rich_record("Delta study", None),
        make_record("Epsilon study", None),
    ]);
    let fetcher = Fetcher::new(registry(vec![first, second]), FetcherConfig::default());

    let query = SearchQuery::new("x").query_type(QueryType::Keyword).limit(5);
    let result = fetcher.search(&query).await;

    assert!(result.sources.len() <= 5);
    assert_eq!(result.total_results, 5);
    assert_eq!(result.apis, vec!["first", "second"]);

    let unique: HashSet<String> = result
        .sources
        .iter()
        .map(|s| normalize_title(&s.title))
        .collect();
    assert_eq!(unique.len(), result.sources.len());

    for pair in result.sources.windows(2) {
        assert!(
            pair[1].completeness - pair[0].completeness <= 0.1,
            "{} ranked above {}",
            pair[0].title,
            pair[1].title
        );
    }
    assert_eq!(result.sources[0].source_api, "second");
}

#[tokio::test]
async fn test_truncation_keeps_most_complete_duplicate() {
    let thin = StubProvider::new("thin").with_records(vec![make_record(
        "Same work",
        Some("10.1000/SAME"),
    )]);
    let rich = StubProvider::new("rich").with_records(vec![rich_record(
        "Same work",
        Some("10.1000/same"),
    )]);
    let fetcher = Fetcher::new(registry(vec![thin, rich]), FetcherConfig::default());

    let result = fetcher.search(&SearchQuery::new("x").limit(1)).await;

    assert_eq!(result.total_results, 1);
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].source_api, "rich");
    assert!(result.sources[0].journal.is_some());
}

#[tokio::test]
async fn test_partial_failure_still_returns_results() {
    let slow = StubProvider::new("slow")
        .hanging(Duration::from_millis(20))
        .with_retries(2);
    let broken = StubProvider::new("broken").failing(ProviderError::Network(
        "connection refused".to_string(),
    ));
    let healthy = StubProvider::new("healthy")
        .with_records(vec![make_record("Survivor", Some("10.1/ok"))]);

    let fetcher = Fetcher::new(
        registry(vec![slow, broken, healthy]),
        FetcherConfig::default().max_parallel_requests(2),
    );
    let result = fetcher.search(&SearchQuery::new("x")).await;

    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].title, "Survivor");
    assert_eq!(result.apis.len(), 3);

    let metrics = fetcher.metrics();
    let slow_metrics = &metrics.iter().find(|(n, _)| n == "slow").unwrap().1;
    assert_eq!(slow_metrics.total_requests, 3);
    assert_eq!(slow_metrics.failed_requests, 3);
    assert!(slow_metrics
        .last_error
        .as_deref()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test]
async fn test_doi_selection_puts_registries_first() {
    let fetcher = Fetcher::new(
        registry(vec![
            StubProvider::new("arxiv"),
            StubProvider::new("zenodo"),
            StubProvider::new("datacite"),
            StubProvider::new("custom"),
            StubProvider::new("crossref"),
        ]),
        FetcherConfig::default(),
    );

    let query = SearchQuery::new("10.1/x").query_type(QueryType::Doi);
    let names: Vec<String> = fetcher
        .select_clients(&query)
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    assert_eq!(names, vec!["crossref", "datacite", "zenodo", "arxiv", "custom"]);
}

#[tokio::test]
async fn test_empty_registry_yields_empty_result() {
    let fetcher = Fetcher::new(ProviderRegistry::empty(), FetcherConfig::default());
    let result = fetcher.search(&SearchQuery::new("anything")).await;

    assert!(result.sources.is_empty());
    assert_eq!(result.total_results, 0);
    assert!(result.apis.is_empty());
}

#[test]
fn test_result_serializes_camel_case() {
    let result = research_federation::SearchResult {
        sources: Vec::new(),
        total_results: 0,
        query: SearchQuery::new("x"),
        apis: vec!["crossref".to_string()],
        search_time: 12,
    };
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["totalResults"], 0);
    assert_eq!(value["searchTime"], 12);
    assert_eq!(value["query"]["type"], "keyword");
}

#[cfg(feature = "full")]
#[test]
fn test_fetcher_from_config_registers_all_providers() {
    let fetcher = Fetcher::from_config(&Config::default()).unwrap();
    assert_eq!(fetcher.registry().len(), 14);
    assert_eq!(fetcher.config().max_parallel_requests, 5);
}
