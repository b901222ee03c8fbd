//! Configuration management.

mod file_config;

pub use file_config::{config_file_candidates, find_config_file, ConfigError};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::utils::ApiConfig;

const ENV_PREFIX: &str = "RESEARCH_FEDERATION";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API keys for providers that accept them
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Contact details for "polite pool" providers
    #[serde(default)]
    pub politeness: Politeness,

    /// Provider selection and fan-out
    #[serde(default)]
    pub fetcher: FetcherSection,

    /// Defaults applied to every provider
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Per-provider overrides
    #[serde(default)]
    pub providers: Vec<ProviderOverride>,
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default)]
    pub semantic_scholar: Option<String>,

    /// CORE API key (optional)
    #[serde(default)]
    pub core: Option<String>,

    /// NCBI E-utilities API key (optional)
    #[serde(default)]
    pub pubmed: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            semantic_scholar: std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok(),
            core: std::env::var("CORE_API_KEY").ok(),
            pubmed: std::env::var("NCBI_API_KEY").ok(),
        }
    }
}

impl ApiKeys {
    /// Key for the provider registered as `name`
    pub fn for_provider(&self, name: &str) -> Option<String> {
        match name {
            "semantic_scholar" => self.semantic_scholar.clone(),
            "core" => self.core.clone(),
            "pubmed" => self.pubmed.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Politeness {
    /// Sent as `mailto` to CrossRef and OpenAlex, `email` to PubMed
    #[serde(default)]
    pub email: Option<String>,
}

impl Default for Politeness {
    fn default() -> Self {
        Self {
            email: std::env::var("RESEARCH_FEDERATION_EMAIL").ok(),
        }
    }
}

/// Fetcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetcherSection {
    /// Providers contacted concurrently per batch
    #[serde(default = "default_max_parallel")]
    pub max_parallel_requests: usize,

    /// Restrict searches to these providers when any of them are available
    #[serde(default)]
    pub preferred_apis: Vec<String>,

    /// Never contact these providers
    #[serde(default)]
    pub excluded_apis: Vec<String>,
}

impl Default for FetcherSection {
    fn default() -> Self {
        Self {
            max_parallel_requests: default_max_parallel(),
            preferred_apis: Vec::new(),
            excluded_apis: Vec::new(),
        }
    }
}

fn default_max_parallel() -> usize {
    5
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Deadline for a single HTTP call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_retries")]
    pub default_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            default_retries: default_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> u32 {
    2
}

/// Overrides for one provider, matched by registry name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderOverride {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Overrides configured for `name`
    pub fn provider(&self, name: &str) -> Option<&ProviderOverride> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Merge global defaults and per-provider overrides over a provider's built-in config
    pub fn api_config(&self, defaults: ApiConfig) -> ApiConfig {
        let api_key = self
            .api_keys
            .for_provider(&defaults.name)
            .or_else(|| defaults.api_key.clone());
        let email = self
            .politeness
            .email
            .clone()
            .or_else(|| defaults.email.clone());

        let mut api = defaults
            .timeout(Duration::from_secs(self.rate_limits.default_timeout_secs))
            .retries(self.rate_limits.default_retries)
            .api_key(api_key)
            .email(email);

        if let Some(o) = self.provider(&api.name) {
            if let Some(rps) = o.requests_per_second {
                api = api.requests_per_second(rps);
            }
            if let Some(secs) = o.timeout_secs {
                api = api.timeout(Duration::from_secs(secs));
            }
            if let Some(retries) = o.retries {
                api = api.retries(retries);
            }
            if let Some(base_url) = &o.base_url {
                api = api.base_url(base_url.clone());
            }
        }

        api
    }

    /// Copy with API keys masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        let mut config = self.clone();
        config.api_keys = ApiKeys {
            semantic_scholar: mask(&self.api_keys.semantic_scholar),
            core: mask(&self.api_keys.core),
            pubmed: mask(&self.api_keys.pubmed),
        };
        config
    }
}

/// Load configuration from a TOML file layered with `RESEARCH_FEDERATION_*` environment variables
///
/// Nested keys use `__`, e.g. `RESEARCH_FEDERATION_FETCHER__MAX_PARALLEL_REQUESTS=8`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    build(Some(path))
}

/// Load from `path`, else from the first discovered config file, else from the environment only
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            load_config(&path)
        }
        None => build(None),
    }
}

fn build(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("fetcher.preferred_apis")
                .with_list_parse_key("fetcher.excluded_apis"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fetcher.max_parallel_requests, 5);
        assert_eq!(config.rate_limits.default_timeout_secs, 10);
        assert_eq!(config.rate_limits.default_retries, 2);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_api_config_merges_overrides() {
        let mut config = Config::default();
        config.api_keys.core = Some("core-key".to_string());
        config.politeness.email = Some("me@example.org".to_string());
        config.rate_limits.default_retries = 4;
        config.providers.push(ProviderOverride {
            name: "core".to_string(),
            requests_per_second: Some(0.5),
            timeout_secs: None,
            retries: None,
            base_url: None,
        });

        let core = config.api_config(ApiConfig::new("core", "https://api.core.ac.uk/v3"));
        assert_eq!(core.api_key.as_deref(), Some("core-key"));
        assert_eq!(core.email.as_deref(), Some("me@example.org"));
        assert_eq!(core.rate_limit.requests_per_second, 0.5);
        assert_eq!(core.retry.max_retries, 4);
        assert_eq!(core.timeout, Duration::from_secs(10));

        let other = config.api_config(ApiConfig::new("doaj", "https://doaj.org/api"));
        assert_eq!(other.api_key, None);
        assert_eq!(other.rate_limit.requests_per_second, 5.0);
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = Config::default();
        config.api_keys.semantic_scholar = Some("secret".to_string());
        config.api_keys.core = None;

        let redacted = config.redacted();
        assert_eq!(redacted.api_keys.semantic_scholar.as_deref(), Some("********"));
        assert_eq!(redacted.api_keys.core, None);
    }
}
