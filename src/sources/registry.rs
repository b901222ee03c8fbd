//! Registry of the provider clients compiled into this build.

use std::sync::Arc;

#[cfg(feature = "source-arxiv")]
use super::ArxivProvider;
#[cfg(feature = "source-base")]
use super::BaseProvider;
#[cfg(feature = "source-biorxiv")]
use super::BiorxivProvider;
#[cfg(feature = "source-core-repo")]
use super::CoreProvider;
#[cfg(feature = "source-crossref")]
use super::CrossRefProvider;
#[cfg(feature = "source-datacite")]
use super::DataCiteProvider;
#[cfg(feature = "source-doaj")]
use super::DoajProvider;
#[cfg(feature = "source-europe_pmc")]
use super::EuropePmcProvider;
#[cfg(feature = "source-openalex")]
use super::OpenAlexProvider;
#[cfg(feature = "source-opencitations")]
use super::OpenCitationsProvider;
#[cfg(feature = "source-plos")]
use super::PlosProvider;
#[cfg(feature = "source-pubmed")]
use super::PubMedProvider;
#[cfg(feature = "source-semantic_scholar")]
use super::SemanticScholarProvider;
#[cfg(feature = "source-zenodo")]
use super::ZenodoProvider;
use super::{ProviderClient, ProviderError};
use crate::config::Config;
use crate::models::QueryType;

bitflags::bitflags! {
    /// Query types a provider can answer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProviderCapabilities: u32 {
        const TITLE_SEARCH = 1 << 0;
        const AUTHOR_SEARCH = 1 << 1;
        const DOI_LOOKUP = 1 << 2;
        const KEYWORD_SEARCH = 1 << 3;
    }
}

impl ProviderCapabilities {
    /// The capability a query type dispatches to
    pub fn for_query_type(query_type: QueryType) -> Self {
        match query_type {
            QueryType::Title => Self::TITLE_SEARCH,
            QueryType::Author => Self::AUTHOR_SEARCH,
            QueryType::Doi | QueryType::Identifier => Self::DOI_LOOKUP,
            QueryType::Keyword => Self::KEYWORD_SEARCH,
        }
    }

    /// Compact "TADK" rendering for listings
    pub fn short(&self) -> String {
        [
            (Self::TITLE_SEARCH, 'T'),
            (Self::AUTHOR_SEARCH, 'A'),
            (Self::DOI_LOOKUP, 'D'),
            (Self::KEYWORD_SEARCH, 'K'),
        ]
        .iter()
        .map(|(flag, c)| if self.contains(*flag) { *c } else { '-' })
        .collect()
    }
}

/// Ordered collection of provider clients
///
/// Registration order is kept so listings and tie-breaks stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Registry with every compiled provider using built-in defaults
    pub fn new() -> Result<Self, ProviderError> {
        Self::from_config(&Config::default())
    }

    /// Registry with no providers
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build every compiled provider, merging `config` over its defaults
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let mut registry = Self::empty();

        #[cfg(feature = "source-crossref")]
        registry.register(Arc::new(CrossRefProvider::new(
            config.api_config(CrossRefProvider::default_config()),
        )?));
        #[cfg(feature = "source-pubmed")]
        registry.register(Arc::new(PubMedProvider::new(
            config.api_config(PubMedProvider::default_config()),
        )?));
        #[cfg(feature = "source-arxiv")]
        registry.register(Arc::new(ArxivProvider::new(
            config.api_config(ArxivProvider::default_config()),
        )?));
        #[cfg(feature = "source-semantic_scholar")]
        registry.register(Arc::new(SemanticScholarProvider::new(
            config.api_config(SemanticScholarProvider::default_config()),
        )?));
        #[cfg(feature = "source-openalex")]
        registry.register(Arc::new(OpenAlexProvider::new(
            config.api_config(OpenAlexProvider::default_config()),
        )?));
        #[cfg(feature = "source-core-repo")]
        registry.register(Arc::new(CoreProvider::new(
            config.api_config(CoreProvider::default_config()),
        )?));
        #[cfg(feature = "source-europe_pmc")]
        registry.register(Arc::new(EuropePmcProvider::new(
            config.api_config(EuropePmcProvider::default_config()),
        )?));
        #[cfg(feature = "source-doaj")]
        registry.register(Arc::new(DoajProvider::new(
            config.api_config(DoajProvider::default_config()),
        )?));
        #[cfg(feature = "source-biorxiv")]
        registry.register(Arc::new(BiorxivProvider::new(
            config.api_config(BiorxivProvider::default_config()),
        )?));
        #[cfg(feature = "source-datacite")]
        registry.register(Arc::new(DataCiteProvider::new(
            config.api_config(DataCiteProvider::default_config()),
        )?));
        #[cfg(feature = "source-zenodo")]
        registry.register(Arc::new(ZenodoProvider::new(
            config.api_config(ZenodoProvider::default_config()),
        )?));
        #[cfg(feature = "source-base")]
        registry.register(Arc::new(BaseProvider::new(
            config.api_config(BaseProvider::default_config()),
        )?));
        #[cfg(feature = "source-plos")]
        registry.register(Arc::new(PlosProvider::new(
            config.api_config(PlosProvider::default_config()),
        )?));
        #[cfg(feature = "source-opencitations")]
        registry.register(Arc::new(OpenCitationsProvider::new(
            config.api_config(OpenCitationsProvider::default_config()),
        )?));

        #[cfg(not(any(
            feature = "source-crossref",
            feature = "source-pubmed",
            feature = "source-arxiv",
            feature = "source-semantic_scholar",
            feature = "source-openalex",
            feature = "source-core-repo",
            feature = "source-europe_pmc",
            feature = "source-doaj",
            feature = "source-biorxiv",
            feature = "source-datacite",
            feature = "source-zenodo",
            feature = "source-base",
            feature = "source-plos",
            feature = "source-opencitations",
        )))]
        let _ = config;

        tracing::debug!(providers = registry.len(), "provider registry built");
        Ok(registry)
    }

    /// Add a provider; one already registered under the same name is replaced in place
    pub fn register(&mut self, provider: Arc<dyn ProviderClient>) {
        match self
            .providers
            .iter_mut()
            .find(|p| p.name() == provider.name())
        {
            Some(slot) => *slot = provider,
            None => self.providers.push(provider),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ProviderClient>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All providers in registration order
    pub fn all(&self) -> &[Arc<dyn ProviderClient>] {
        &self.providers
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    /// Providers supporting `capability`
    pub fn with_capability(
        &self,
        capability: ProviderCapabilities,
    ) -> Vec<&Arc<dyn ProviderClient>> {
        self.providers
            .iter()
            .filter(|p| p.capabilities().contains(capability))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
