//! Configuration file discovery and TOML round-tripping.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! semantic_scholar = "your-api-key"
//! core = "your-core-api-key"
//!
//! [politeness]
//! email = "you@example.org"
//!
//! [fetcher]
//! max_parallel_requests = 5
//! preferred_apis = ["crossref", "openalex", "pubmed"]
//! excluded_apis = ["base"]
//!
//! [rate_limits]
//! default_timeout_secs = 10
//! default_retries = 2
//!
//! [[providers]]
//! name = "semantic_scholar"
//! requests_per_second = 0.5
//!
//! [[providers]]
//! name = "arxiv"
//! timeout_secs = 20
//! ```

use std::path::{Path, PathBuf};

use super::Config;

const LOCAL_FILE: &str = "research-federation.toml";
const APP_DIR: &str = "research-federation";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Locations searched for a configuration file, in order
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(LOCAL_FILE)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join("config.toml"));
    }
    candidates
}

/// First existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    config_file_candidates().into_iter().find(|p| p.is_file())
}

impl Config {
    /// Parse TOML text without environment layering
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::load_config;
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[api_keys]
semantic_scholar = "test-key"
core = "core-key"

[politeness]
email = "lab@example.org"

[fetcher]
max_parallel_requests = 3
preferred_apis = ["crossref", "pubmed"]

[rate_limits]
default_timeout_secs = 7

[[providers]]
name = "semantic_scholar"
requests_per_second = 0.5

[[providers]]
name = "arxiv"
retries = 0
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(
            config.api_keys.semantic_scholar,
            Some("test-key".to_string())
        );
        assert_eq!(config.api_keys.core, Some("core-key".to_string()));
        assert_eq!(config.politeness.email.as_deref(), Some("lab@example.org"));
        assert_eq!(config.fetcher.max_parallel_requests, 3);
        assert_eq!(config.fetcher.preferred_apis, vec!["crossref", "pubmed"]);
        assert!(config.fetcher.excluded_apis.is_empty());
        assert_eq!(config.rate_limits.default_timeout_secs, 7);
        assert_eq!(config.rate_limits.default_retries, 2);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(
            config.provider("semantic_scholar").unwrap().requests_per_second,
            Some(0.5)
        );
        assert_eq!(config.provider("arxiv").unwrap().retries, Some(0));
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::from_toml_str("").unwrap();
        config.api_keys.semantic_scholar = Some("saved-key".to_string());
        config.fetcher.excluded_apis = vec!["base".to_string()];
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded = Config::from_toml_str(&content).unwrap();
        assert_eq!(
            loaded.api_keys.semantic_scholar,
            Some("saved-key".to_string())
        );
        assert_eq!(loaded.fetcher.excluded_apis, vec!["base"]);
    }

    #[test]
    fn test_config_file_nonexistent() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");

        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(&path).is_err());
        assert!(Config::from_toml_str("invalid = toml = content").is_err());
    }

    #[test]
    fn test_candidates_start_with_local_file() {
        let candidates = config_file_candidates();
        assert_eq!(candidates[0], PathBuf::from("research-federation.toml"));
    }
}
