use crate::models::SourceType;

/// Keyword table for publication types, checked in order
///
/// More specific vocabularies come first so "proceedings-article" lands on
/// conference and "book-chapter" on book before the generic "article" entry.
const TYPE_KEYWORDS: &[(SourceType, &[&str])] = &[
    (
        SourceType::Preprint,
        &["preprint", "posted-content", "posted content", "arxiv", "working paper"],
    ),
    (SourceType::Thesis, &["thesis", "dissertation", "doctoral"]),
    (
        SourceType::Conference,
        &[
            "conference",
            "proceedings",
            "congress",
            "symposium",
            "workshop",
            "meeting",
        ],
    ),
    (SourceType::Book, &["book", "chapter", "monograph", "edited-volume"]),
    (SourceType::Dataset, &["dataset", "data set", "database"]),
    (SourceType::Website, &["website", "webpage", "web page", "blog"]),
    (
        SourceType::Journal,
        &["journal", "article", "review", "letter", "editorial", "paper"],
    ),
];

/// Map a provider's type string onto the closed set
///
/// Case-insensitive substring match; unrecognized vocabularies become
/// [`SourceType::Other`].
pub fn normalize_type(raw: &str) -> SourceType {
    let lowered = raw.to_lowercase();
    TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or(SourceType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_vocabularies() {
        assert_eq!(normalize_type("journal-article"), SourceType::Journal);
        assert_eq!(normalize_type("Journal Article"), SourceType::Journal);
        assert_eq!(normalize_type("proceedings-article"), SourceType::Conference);
        assert_eq!(normalize_type("book-chapter"), SourceType::Book);
        assert_eq!(normalize_type("posted-content"), SourceType::Preprint);
        assert_eq!(normalize_type("Dissertation"), SourceType::Thesis);
        assert_eq!(normalize_type("Dataset"), SourceType::Dataset);
        assert_eq!(normalize_type("research-article"), SourceType::Journal);
    }

    #[test]
    fn test_unknown_is_other() {
        assert_eq!(normalize_type("software"), SourceType::Other);
        assert_eq!(normalize_type(""), SourceType::Other);
    }
}
