//! Federated search orchestration.
//!
//! A [`Fetcher`] runs one search as a fixed pipeline:
//!
//! 1. select the providers for the query type, in priority order
//! 2. fan out in batches of `max_parallel_requests`
//! 3. normalize every returned record, skipping the ones that fail
//! 4. deduplicate across providers
//! 5. rank, then truncate to the query limit
//!
//! Nothing is kept between searches apart from the per-provider metrics each
//! gateway accumulates. Provider failures never fail the search; they only
//! shrink the result set.
//!
//! ```rust,no_run
//! use research_federation::{Config, Fetcher, QueryType, SearchQuery};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::from_config(&Config::default())?;
//! let query = SearchQuery::new("attention is all you need")
//!     .query_type(QueryType::Title)
//!     .limit(5);
//!
//! let result = fetcher.search(&query).await;
//! for source in &result.sources {
//!     println!("{:.2} {}", source.completeness, source.title);
//! }
//! # Ok(())
//! # }
//! ```

mod priority;

pub use priority::{priority, table as priority_table, UNRANKED};

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use serde_json::Value;

use crate::config::{Config, FetcherSection};
use crate::models::{NormalizedSource, QueryType, SearchQuery, SearchResult};
use crate::normalizer::Normalizer;
use crate::sources::{ProviderClient, ProviderError, ProviderRegistry};
use crate::utils::ApiMetrics;

/// Completeness differences at or below this do not decide the ranking
const COMPLETENESS_BAND: f64 = 0.1;

/// Provider selection and fan-out settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Providers contacted concurrently per batch
    pub max_parallel_requests: usize,
    /// Narrow the provider set to these when any of them are registered
    pub preferred_apis: Vec<String>,
    /// Never contact these providers
    pub excluded_apis: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::from(&FetcherSection::default())
    }
}

impl From<&FetcherSection> for FetcherConfig {
    fn from(section: &FetcherSection) -> Self {
        Self {
            max_parallel_requests: section.max_parallel_requests,
            preferred_apis: section.preferred_apis.clone(),
            excluded_apis: section.excluded_apis.clone(),
        }
    }
}

impl FetcherConfig {
    pub fn max_parallel_requests(mut self, n: usize) -> Self {
        self.max_parallel_requests = n;
        self
    }

    pub fn preferred_apis<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_apis = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn excluded_apis<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_apis = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Transformed records from one successful provider call
#[derive(Debug, Clone)]
pub struct ProviderResults {
    pub api_name: String,
    pub data: Vec<Value>,
}

/// Federated search across the providers of a [`ProviderRegistry`]
#[derive(Debug, Clone)]
pub struct Fetcher {
    registry: ProviderRegistry,
    normalizer: Normalizer,
    config: FetcherConfig,
}

impl Fetcher {
    pub fn new(registry: ProviderRegistry, config: FetcherConfig) -> Self {
        Self {
            registry,
            normalizer: Normalizer::new(),
            config,
        }
    }

    /// Every compiled provider configured from `config`
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Ok(Self::new(
            ProviderRegistry::from_config(config)?,
            FetcherConfig::from(&config.fetcher),
        ))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Providers to query, best first
    ///
    /// All registered providers minus the excluded ones, narrowed to the
    /// preferred list unless that leaves nothing. The priority sort is stable
    /// so unranked providers keep registration order.
    pub fn select_clients(&self, query: &SearchQuery) -> Vec<Arc<dyn ProviderClient>> {
        let available: Vec<Arc<dyn ProviderClient>> = self
            .registry
            .all()
            .iter()
            .filter(|client| {
                !self
                    .config
                    .excluded_apis
                    .iter()
                    .any(|name| name == client.name())
            })
            .cloned()
            .collect();

        let mut selected = if self.config.preferred_apis.is_empty() {
            available
        } else {
            let preferred: Vec<Arc<dyn ProviderClient>> = available
                .iter()
                .filter(|client| {
                    self.config
                        .preferred_apis
                        .iter()
                        .any(|name| name == client.name())
                })
                .cloned()
                .collect();
            if preferred.is_empty() {
                tracing::debug!(
                    preferred = ?self.config.preferred_apis,
                    "no preferred provider registered, using all"
                );
                available
            } else {
                preferred
            }
        };

        selected.sort_by_key(|client| priority(query.query_type, client.name()));
        selected
    }

    /// Query `clients` in sequential batches, each batch concurrently
    ///
    /// Every call in a batch settles before the next batch starts. Only
    /// successful outcomes are returned.
    pub async fn execute_parallel_searches(
        &self,
        clients: &[Arc<dyn ProviderClient>],
        query: &SearchQuery,
    ) -> Vec<ProviderResults> {
        let batch_size = self.config.max_parallel_requests.max(1);
        let mut results = Vec::with_capacity(clients.len());

        for (batch_index, batch) in clients.chunks(batch_size).enumerate() {
            tracing::debug!(
                batch = batch_index,
                providers = ?batch.iter().map(|c| c.name()).collect::<Vec<_>>(),
                "dispatching batch"
            );
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|client| Self::execute_search(client.as_ref(), query)),
            )
            .await;
            results.extend(outcomes.into_iter().flatten());
        }

        results
    }

    /// Run the operation matching the query type on one provider
    ///
    /// A failed call is logged and yields `None`.
    pub async fn execute_search(
        client: &dyn ProviderClient,
        query: &SearchQuery,
    ) -> Option<ProviderResults> {
        let text = query.query.as_str();
        let limit = query.limit;
        let response = match query.query_type {
            QueryType::Doi | QueryType::Identifier => client.search_by_doi(text, limit).await,
            QueryType::Title => client.search_by_title(text, limit).await,
            QueryType::Author => client.search_by_author(text, limit).await,
            QueryType::Keyword => client.search_by_keyword(text, limit).await,
        };

        match response.result {
            Ok(payload) => {
                let data = client.transform_response(&payload);
                tracing::debug!(provider = %response.api_name, records = data.len(), "provider answered");
                Some(ProviderResults {
                    api_name: response.api_name,
                    data,
                })
            }
            Err(ProviderError::Unsupported(reason)) => {
                tracing::debug!(provider = %response.api_name, "{}", reason);
                None
            }
            Err(err) => {
                tracing::warn!(provider = %response.api_name, error = %err, "provider search failed");
                None
            }
        }
    }

    /// Normalize every record, dropping failures and untitled records
    pub fn normalize_results(&self, results: &[ProviderResults]) -> Vec<NormalizedSource> {
        let mut sources = Vec::new();
        for result in results {
            for raw in &result.data {
                match self.normalizer.normalize(raw, &result.api_name) {
                    Ok(source) if source.title.is_empty() => {
                        tracing::debug!(provider = %result.api_name, id = %source.id, "dropping untitled record");
                    }
                    Ok(source) => sources.push(source),
                    Err(err) => {
                        tracing::warn!(provider = %result.api_name, error = %err, "skipping record");
                    }
                }
            }
        }
        sources
    }

    /// Run a federated search
    pub async fn search(&self, query: &SearchQuery) -> SearchResult {
        let started = Instant::now();

        let clients = self.select_clients(query);
        let apis: Vec<String> = clients.iter().map(|c| c.name().to_string()).collect();
        tracing::info!(
            query = %query.query,
            query_type = %query.query_type,
            providers = apis.len(),
            "federated search"
        );

        let results = self.execute_parallel_searches(&clients, query).await;
        let answered = results.len();
        let normalized = self.normalize_results(&results);
        let fetched = normalized.len();

        let mut sources = self.normalizer.deduplicate(normalized);
        let total_results = sources.len();
        sort_results(&mut sources);
        sources.truncate(query.limit);

        let search_time = started.elapsed().as_millis() as u64;
        tracing::info!(
            answered,
            fetched,
            unique = total_results,
            returned = sources.len(),
            elapsed_ms = search_time,
            "federated search finished"
        );

        SearchResult {
            sources,
            total_results,
            query: query.clone(),
            apis,
            search_time,
        }
    }

    /// Metrics snapshot per provider, in registration order
    pub fn metrics(&self) -> Vec<(String, ApiMetrics)> {
        self.registry
            .all()
            .iter()
            .map(|client| (client.name().to_string(), client.metrics()))
            .collect()
    }
}

/// Ranking comparator: `Less` means `a` goes first
///
/// Completeness only decides when the gap exceeds [`COMPLETENESS_BAND`];
/// otherwise citations, then year, both descending with absent as zero.
pub fn rank_order(a: &NormalizedSource, b: &NormalizedSource) -> Ordering {
    let gap = b.completeness - a.completeness;
    if gap.abs() > COMPLETENESS_BAND {
        return if gap > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    let citations = b
        .citation_count
        .unwrap_or(0)
        .cmp(&a.citation_count.unwrap_or(0));
    citations.then_with(|| {
        b.publication_year
            .unwrap_or(0)
            .cmp(&a.publication_year.unwrap_or(0))
    })
}

/// Stable in-place ranking by [`rank_order`]
///
/// The completeness band makes the comparator non-transitive, which
/// `slice::sort_by` does not allow, so this is a plain insertion sort.
pub fn sort_results(sources: &mut [NormalizedSource]) {
    for i in 1..sources.len() {
        let mut j = i;
        while j > 0 && rank_order(&sources[j - 1], &sources[j]) == Ordering::Greater {
            sources.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::make_record;
    use crate::sources::StubProvider;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    fn source(title: &str, completeness: f64, citations: Option<u64>, year: Option<i32>) -> NormalizedSource {
        NormalizedSource {
            id: title.to_string(),
            doi: None,
            pmid: None,
            pmcid: None,
            arxiv_id: None,
            isbn: None,
            issn: None,
            title: title.to_string(),
            authors: Vec::new(),
            publication_year: year,
            publication_date: None,
            source_type: crate::models::SourceType::Other,
            journal: None,
            volume: None,
            issue: None,
            pages: None,
            publisher: None,
            url: None,
            pdf_url: None,
            is_open_access: None,
            r#abstract: None,
            keywords: Vec::new(),
            citation_count: citations,
            impact_factor: None,
            completeness,
            source_api: "test".to_string(),
            fetched_at: Utc::now(),
        }
    }

    fn titles(sources: &[NormalizedSource]) -> Vec<&str> {
        sources.iter().map(|s| s.title.as_str()).collect()
    }

    fn fetcher(stubs: Vec<StubProvider>, config: FetcherConfig) -> Fetcher {
        let mut registry = ProviderRegistry::empty();
        for stub in stubs {
            registry.register(Arc::new(stub));
        }
        Fetcher::new(registry, config)
    }

    #[test]
    fn test_rank_completeness_band() {
        let mut sources = vec![
            source("low", 0.30, None, None),
            source("high", 0.90, None, None),
            source("close-cited", 0.85, Some(50), None),
        ];
        sort_results(&mut sources);
        assert_eq!(titles(&sources), vec!["close-cited", "high", "low"]);
    }

    #[test]
    fn test_rank_year_then_input_order() {
        let mut sources = vec![
            source("a", 0.5, Some(3), Some(2001)),
            source("b", 0.5, Some(3), Some(2020)),
            source("c", 0.5, Some(3), Some(2001)),
            source("d", 0.5, None, None),
        ];
        sort_results(&mut sources);
        assert_eq!(titles(&sources), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_select_excludes_and_ranks() {
        let fetcher = fetcher(
            vec![
                StubProvider::new("arxiv"),
                StubProvider::new("openalex"),
                StubProvider::new("crossref"),
                StubProvider::new("base"),
            ],
            FetcherConfig::default().excluded_apis(["base"]),
        );

        let query = SearchQuery::new("10.1/x").query_type(QueryType::Doi);
        let names: Vec<String> = fetcher
            .select_clients(&query)
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["crossref", "openalex", "arxiv"]);
    }

    #[test]
    fn test_preferred_falls_back_when_none_registered() {
        let stubs = || vec![StubProvider::new("crossref"), StubProvider::new("pubmed")];
        let query = SearchQuery::new("x");

        let narrowed = fetcher(stubs(), FetcherConfig::default().preferred_apis(["pubmed"]));
        assert_eq!(narrowed.select_clients(&query).len(), 1);

        let fallback = fetcher(stubs(), FetcherConfig::default().preferred_apis(["scopus"]));
        assert_eq!(fallback.select_clients(&query).len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_by_query_type() {
        let stub = Arc::new(StubProvider::new("stub"));
        let mut registry = ProviderRegistry::empty();
        registry.register(stub.clone());
        let fetcher = Fetcher::new(registry, FetcherConfig::default());

        for query_type in [
            QueryType::Identifier,
            QueryType::Title,
            QueryType::Author,
            QueryType::Keyword,
            QueryType::Doi,
        ] {
            fetcher
                .search(&SearchQuery::new("x").query_type(query_type))
                .await;
        }
        assert_eq!(stub.calls(), vec!["doi", "title", "author", "keyword", "doi"]);
    }

    #[tokio::test]
    async fn test_failures_are_skipped() {
        let fetcher = fetcher(
            vec![
                StubProvider::new("broken").failing(ProviderError::HttpStatus {
                    status: 500,
                    message: "boom".to_string(),
                }),
                StubProvider::new("ok").with_records(vec![make_record("Kept", None)]),
            ],
            FetcherConfig::default(),
        );

        let result = fetcher.search(&SearchQuery::new("x")).await;
        assert_eq!(result.apis, vec!["broken", "ok"]);
        assert_eq!(titles(&result.sources), vec!["Kept"]);
    }

    #[tokio::test]
    async fn test_bad_and_untitled_records_dropped() {
        let fetcher = fetcher(
            vec![StubProvider::new("stub").with_records(vec![
                json!("not an object"),
                json!({"title": "   ", "doi": "10.1/untitled"}),
                make_record("Good", None),
            ])],
            FetcherConfig::default(),
        );

        let result = fetcher.search(&SearchQuery::new("x")).await;
        assert_eq!(result.total_results, 1);
        assert_eq!(titles(&result.sources), vec!["Good"]);
    }

    #[tokio::test]
    async fn test_batches_complete_with_single_slot() {
        let fetcher = fetcher(
            vec![
                StubProvider::new("a")
                    .with_records(vec![make_record("From A", None)])
                    .with_delay(Duration::from_millis(20)),
                StubProvider::new("b").with_records(vec![make_record("From B", None)]),
                StubProvider::new("c").with_records(vec![make_record("From C", None)]),
            ],
            FetcherConfig::default().max_parallel_requests(1),
        );

        let result = fetcher.search(&SearchQuery::new("x")).await;
        assert_eq!(result.total_results, 3);
    }

    fn delayed_stubs(count: usize, delay: Duration) -> Vec<StubProvider> {
        (0..count)
            .map(|i| {
                let name = format!("slow-{}", i);
                StubProvider::new(&name)
                    .with_records(vec![make_record(&format!("Record {}", i), None)])
                    .with_delay(delay)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batches_run_one_after_another() {
        let fetcher = fetcher(
            delayed_stubs(4, Duration::from_millis(200)),
            FetcherConfig::default().max_parallel_requests(2),
        );

        let started = std::time::Instant::now();
        let result = fetcher.search(&SearchQuery::new("x")).await;
        let elapsed = started.elapsed();

        assert_eq!(result.total_results, 4);
        assert!(elapsed >= Duration::from_millis(400), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(700), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_single_batch_runs_concurrently() {
        let fetcher = fetcher(
            delayed_stubs(4, Duration::from_millis(200)),
            FetcherConfig::default().max_parallel_requests(4),
        );

        let started = std::time::Instant::now();
        let result = fetcher.search(&SearchQuery::new("x")).await;
        let elapsed = started.elapsed();

        assert_eq!(result.total_results, 4);
        assert!(elapsed >= Duration::from_millis(200), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_zero_parallelism_still_searches() {
        let fetcher = fetcher(
            vec![StubProvider::new("a").with_records(vec![make_record("A", None)])],
            FetcherConfig::default().max_parallel_requests(0),
        );
        assert_eq!(fetcher.search(&SearchQuery::new("x")).await.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_metrics_per_provider() {
        let fetcher = fetcher(
            vec![StubProvider::new("a"), StubProvider::new("b")],
            FetcherConfig::default(),
        );
        let names: Vec<String> = fetcher.metrics().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
