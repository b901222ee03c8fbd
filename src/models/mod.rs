//! Core data models for normalized records and search operations.

mod search;
mod source;

pub use search::{QueryType, SearchFilters, SearchQuery, SearchResult};
pub use source::{Author, NormalizedSource, SourceType};
