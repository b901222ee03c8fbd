//! Completeness scoring.

use crate::models::{NormalizedSource, SourceType};

/// Presence weights; they sum to exactly 1.0
const WEIGHTS: Weights = Weights {
    title: 0.20,
    authors: 0.15,
    year: 0.10,
    doi: 0.15,
    r#abstract: 0.10,
    journal: 0.10,
    url: 0.05,
    source_type: 0.05,
    volume: 0.025,
    issue: 0.025,
    pages: 0.025,
    publisher: 0.025,
};

struct Weights {
    title: f64,
    authors: f64,
    year: f64,
    doi: f64,
    r#abstract: f64,
    journal: f64,
    url: f64,
    source_type: f64,
    volume: f64,
    issue: f64,
    pages: f64,
    publisher: f64,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Weighted sum over which fields are non-empty, clamped to `[0, 1]`
///
/// Type scores only when it maps onto a known [`SourceType`]: a raw type the
/// keyword table does not recognise (Zenodo "software", DataCite "Text")
/// lands on `Other` and counts as absent.
pub fn completeness(source: &NormalizedSource) -> f64 {
    let w = &WEIGHTS;
    let checks = [
        (!source.title.trim().is_empty(), w.title),
        (!source.authors.is_empty(), w.authors),
        (source.publication_year.is_some(), w.year),
        (present(&source.doi), w.doi),
        (present(&source.r#abstract), w.r#abstract),
        (present(&source.journal), w.journal),
        (present(&source.url), w.url),
        (source.source_type != SourceType::Other, w.source_type),
        (present(&source.volume), w.volume),
        (present(&source.issue), w.issue),
        (present(&source.pages), w.pages),
        (present(&source.publisher), w.publisher),
    ];

    let score: f64 = checks
        .iter()
        .filter(|(is_present, _)| *is_present)
        .map(|(_, weight)| weight)
        .sum();

    score.clamp(0.0, 1.0)
}
