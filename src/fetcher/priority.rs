//! Hand-tuned provider rankings per query type.

use crate::models::QueryType;

/// Rank given to providers missing from a table
pub const UNRANKED: usize = 999;

const DOI_PRIORITY: &[&str] = &[
    "crossref",
    "datacite",
    "opencitations",
    "openalex",
    "semantic_scholar",
    "pubmed",
    "europe_pmc",
    "biorxiv",
    "core",
    "zenodo",
    "doaj",
    "plos",
    "base",
];

const TITLE_PRIORITY: &[&str] = &[
    "crossref",
    "openalex",
    "semantic_scholar",
    "pubmed",
    "europe_pmc",
    "core",
    "arxiv",
    "doaj",
    "base",
    "plos",
    "zenodo",
    "datacite",
];

const AUTHOR_PRIORITY: &[&str] = &[
    "openalex",
    "semantic_scholar",
    "crossref",
    "pubmed",
    "europe_pmc",
    "arxiv",
    "core",
    "datacite",
    "zenodo",
    "base",
    "plos",
];

const KEYWORD_PRIORITY: &[&str] = &[
    "semantic_scholar",
    "openalex",
    "crossref",
    "pubmed",
    "europe_pmc",
    "core",
    "arxiv",
    "doaj",
    "plos",
    "base",
    "zenodo",
    "datacite",
];

/// The ranking table for a query type, best first
pub fn table(query_type: QueryType) -> &'static [&'static str] {
    match query_type {
        QueryType::Doi | QueryType::Identifier => DOI_PRIORITY,
        QueryType::Title => TITLE_PRIORITY,
        QueryType::Author => AUTHOR_PRIORITY,
        QueryType::Keyword => KEYWORD_PRIORITY,
    }
}

/// Position of `provider` in the table for `query_type`, or [`UNRANKED`]
pub fn priority(query_type: QueryType, provider: &str) -> usize {
    table(query_type)
        .iter()
        .position(|name| *name == provider)
        .unwrap_or(UNRANKED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_table_leads_with_registries() {
        assert_eq!(priority(QueryType::Doi, "crossref"), 0);
        assert_eq!(priority(QueryType::Doi, "datacite"), 1);
        assert_eq!(priority(QueryType::Identifier, "crossref"), 0);
    }

    #[test]
    fn test_unranked_sorts_last() {
        assert_eq!(priority(QueryType::Doi, "arxiv"), UNRANKED);
        assert_eq!(priority(QueryType::Keyword, "nonexistent"), UNRANKED);
    }

    #[test]
    fn test_tables_have_no_duplicates() {
        for query_type in [
            QueryType::Doi,
            QueryType::Title,
            QueryType::Author,
            QueryType::Keyword,
        ] {
            let names = table(query_type);
            for (i, name) in names.iter().enumerate() {
                assert_eq!(priority(query_type, name), i, "{} in {}", name, query_type);
            }
        }
    }
}
