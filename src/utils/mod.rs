//! Utility modules supporting federated search.
//!
//! - [`HttpClient`]: shared reqwest client construction
//! - [`NetworkGateway`]: per-provider rate limiting, timeout, retry and metrics
//! - [`RetryConfig`] / [`TransientError`]: backoff schedule and retry classification
//! - [`deduplicate`]: single-pass DOI/title deduplication
//!
//! # Executing a request through a gateway
//!
//! ```rust,no_run
//! use research_federation::utils::{ApiConfig, HttpClient, NetworkGateway, ParseAs};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::new("crossref", "https://api.crossref.org").requests_per_second(2.0);
//! let gateway = NetworkGateway::new(config, HttpClient::new()?);
//!
//! let response = gateway
//!     .get("https://api.crossref.org/works?query=graphene&rows=5", ParseAs::Json)
//!     .await;
//! if let Some(payload) = response.data() {
//!     println!("{:?}", payload.as_json());
//! }
//! # Ok(())
//! # }
//! ```

mod dedup;
mod gateway;
mod http;
mod retry;

pub use dedup::{dedup_key, deduplicate, normalize_title};
pub use gateway::{
    ApiConfig, ApiMetrics, ApiResponse, ExecuteOptions, NetworkGateway, ParseAs, Payload,
    RateLimitInfo, RateLimitSpec,
};
pub use http::HttpClient;
pub use retry::{RetryConfig, TransientError};
