//! Per-provider request execution: rate limiting, timeouts, retries and metrics.
//!
//! Every provider owns exactly one [`NetworkGateway`]. The gateway holds that
//! provider's rate limiter and counters, so providers never coordinate with
//! each other. Concurrent calls against the same provider queue on its
//! limiter.
//!
//! Failures never escape as errors: [`NetworkGateway::execute_request`]
//! always returns an [`ApiResponse`] whose `result` carries either the parsed
//! payload or the final [`ProviderError`].

use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};

use crate::sources::ProviderError;
use crate::utils::{HttpClient, RetryConfig, TransientError};

/// How a successful response body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAs {
    Json,
    Text,
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }
}

/// Longest spacing a rate limit can impose (one request per day)
pub const MAX_REQUEST_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Requests-per-second budget for one provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSpec {
    pub requests_per_second: f64,
}

impl RateLimitSpec {
    pub fn per_second(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
        }
    }

    /// Minimum spacing between two requests (`1000 / rps` ms); `None` when unlimited
    ///
    /// Budgets so small that the spacing overflows a `Duration` are capped at
    /// [`MAX_REQUEST_INTERVAL`].
    pub fn min_interval(&self) -> Option<Duration> {
        if self.requests_per_second.is_finite() && self.requests_per_second > 0.0 {
            let interval = Duration::try_from_secs_f64(1.0 / self.requests_per_second)
                .unwrap_or(MAX_REQUEST_INTERVAL);
            Some(interval.min(MAX_REQUEST_INTERVAL))
        } else {
            None
        }
    }
}

/// Static configuration for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Contact address for providers with a polite pool
    pub email: Option<String>,
    pub rate_limit: RateLimitSpec,
    /// Deadline for a single HTTP call
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl ApiConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: None,
            email: None,
            rate_limit: RateLimitSpec::per_second(5.0),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn requests_per_second(mut self, rps: f64) -> Self {
        self.rate_limit = RateLimitSpec::per_second(rps);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retry.max_retries = retries;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Rate-limit headers last reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Extract `x-ratelimit-*` headers; `None` when none are present
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        let info = Self {
            limit: read("x-ratelimit-limit"),
            remaining: read("x-ratelimit-remaining"),
            reset: read("x-ratelimit-reset"),
        };

        if info == Self::default() {
            None
        } else {
            Some(info)
        }
    }
}

/// Runtime counters for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Running mean over successful requests
    pub average_response_time_ms: f64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// Discriminated outcome of a gateway call
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub api_name: String,
    pub timestamp: DateTime<Utc>,
    pub result: Result<T, ProviderError>,
}

impl<T> ApiResponse<T> {
    pub fn success(api_name: impl Into<String>, data: T) -> Self {
        Self {
            api_name: api_name.into(),
            timestamp: Utc::now(),
            result: Ok(data),
        }
    }

    pub fn failure(api_name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            api_name: api_name.into(),
            timestamp: Utc::now(),
            result: Err(error),
        }
    }

    /// Failure for an operation the provider cannot perform
    pub fn unsupported(api_name: impl Into<String>, capability: &str) -> Self {
        Self::failure(
            api_name,
            ProviderError::Unsupported(format!("{} not supported", capability)),
        )
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn data(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ProviderError> {
        self.result.as_ref().err()
    }

    /// Transform the payload, keeping name and timestamp
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            api_name: self.api_name,
            timestamp: self.timestamp,
            result: self.result.map(f),
        }
    }
}

/// Per-call overrides for [`NetworkGateway::execute_request`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecuteOptions {
    pub retries: u32,
    pub timeout: Duration,
    pub parse_as: ParseAs,
}

/// Shared request execution owned by each provider
pub struct NetworkGateway {
    config: ApiConfig,
    http: HttpClient,
    limiter: Option<DefaultDirectRateLimiter>,
    metrics: Mutex<ApiMetrics>,
    rate_limit_info: Mutex<Option<RateLimitInfo>>,
}

impl std::fmt::Debug for NetworkGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkGateway")
            .field("config", &self.config)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl NetworkGateway {
    pub fn new(config: ApiConfig, http: HttpClient) -> Self {
        // Burst of one: each request waits for the full interval since the previous one.
        let limiter = config
            .rate_limit
            .min_interval()
            .and_then(Quota::with_period)
            .map(|quota| RateLimiter::direct(quota.allow_burst(nonzero!(1u32))));

        Self {
            config,
            http,
            limiter,
            metrics: Mutex::new(ApiMetrics::default()),
            rate_limit_info: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Options derived from the provider configuration
    pub fn default_options(&self, parse_as: ParseAs) -> ExecuteOptions {
        ExecuteOptions {
            retries: self.config.retry.max_retries,
            timeout: self.config.timeout,
            parse_as,
        }
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> ApiMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rate-limit headers from the most recent successful response
    pub fn rate_limit_info(&self) -> Option<RateLimitInfo> {
        self.rate_limit_info
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// GET `url` with the provider's default options
    pub async fn get(&self, url: &str, parse_as: ParseAs) -> ApiResponse<Payload> {
        self.send(parse_as, |client| client.get(url)).await
    }

    /// Send a request built against the provider's client
    pub async fn send<B>(&self, parse_as: ParseAs, build: B) -> ApiResponse<Payload>
    where
        B: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let options = self.default_options(parse_as);
        let client = self.http.client();
        self.execute_request(|| build(client).send(), options).await
    }

    /// Run `request_fn` under this provider's rate limit, timeout and retry policy
    ///
    /// Retries happen only for timeouts, HTTP 429 and HTTP 503, waiting
    /// `min(initial * 2^attempt, max)` before each retry.
    pub async fn execute_request<F, Fut>(
        &self,
        mut request_fn: F,
        options: ExecuteOptions,
    ) -> ApiResponse<Payload>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut remaining = options.retries;

        loop {
            let attempt = options.retries - remaining;
            self.wait_for_slot().await;

            let started = Instant::now();
            self.with_metrics(|m| m.total_requests += 1);

            match self.attempt(&mut request_fn, &options).await {
                Ok(payload) => {
                    self.record_success(started.elapsed());
                    if attempt > 0 {
                        tracing::debug!(
                            api = %self.config.name,
                            attempt,
                            "request succeeded after retry"
                        );
                    }
                    return ApiResponse::success(&self.config.name, payload);
                }
                Err(error) => {
                    self.record_failure(&error);

                    let transient = TransientError::from_provider_error(&error);
                    if transient.is_some() && remaining > 0 {
                        let delay = self.config.retry.delay_for_attempt(attempt);
                        tracing::debug!(
                            api = %self.config.name,
                            attempt,
                            ?transient,
                            ?delay,
                            "transient failure, retrying"
                        );
                        sleep(delay).await;
                        remaining -= 1;
                        continue;
                    }

                    tracing::debug!(
                        api = %self.config.name,
                        attempts = attempt + 1,
                        %error,
                        "request failed"
                    );
                    return ApiResponse::failure(&self.config.name, error);
                }
            }
        }
    }

    async fn wait_for_slot(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn attempt<F, Fut>(
        &self,
        request_fn: &mut F,
        options: &ExecuteOptions,
    ) -> Result<Payload, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let call = async {
            let response = request_fn().await?;
            let status = response.status();

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::HttpStatus {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect(),
                });
            }

            if let Some(info) = RateLimitInfo::from_headers(response.headers()) {
                *self
                    .rate_limit_info
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(info);
            }

            let text = response.text().await?;
            let payload = match options.parse_as {
                ParseAs::Text => Payload::Text(text),
                ParseAs::Json => Payload::Json(serde_json::from_str(&text)?),
            };
            Ok::<Payload, ProviderError>(payload)
        };

        match timeout(options.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(options.timeout)),
        }
    }

    fn record_success(&self, elapsed: Duration) {
        let sample = elapsed.as_secs_f64() * 1000.0;
        self.with_metrics(|m| {
            m.successful_requests += 1;
            let n = m.successful_requests as f64;
            m.average_response_time_ms = (m.average_response_time_ms * (n - 1.0) + sample) / n;
        });
    }

    fn record_failure(&self, error: &ProviderError) {
        let message = error.to_string();
        self.with_metrics(|m| {
            m.failed_requests += 1;
            m.last_error = Some(message);
            m.last_error_at = Some(Utc::now());
        });
    }

    fn with_metrics(&self, update: impl FnOnce(&mut ApiMetrics)) {
        let mut guard = self
            .metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut guard);
    }
}
