//! # Research Federation
//!
//! Federated search across fourteen academic and bibliographic databases,
//! with per-provider rate limiting, record normalization, cross-provider
//! deduplication and completeness-based ranking.
//!
//! ## Architecture
//!
//! - [`models`]: normalized records and the search query/result contract
//! - [`utils`]: HTTP client, the per-provider network gateway, retry policy, deduplication
//! - [`sources`]: the [`ProviderClient`] trait, the provider clients and their registry
//! - [`normalizer`]: raw provider records to [`NormalizedSource`]
//! - [`fetcher`]: provider selection, batched fan-out, ranking
//! - [`config`]: layered configuration

pub mod config;
pub mod fetcher;
pub mod models;
pub mod normalizer;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use fetcher::{Fetcher, FetcherConfig};
pub use models::{NormalizedSource, QueryType, SearchQuery, SearchResult, SourceType};
pub use normalizer::Normalizer;
pub use sources::{ProviderClient, ProviderError, ProviderRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
