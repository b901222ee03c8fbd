//! Deduplication of normalized records across providers.

use std::collections::HashMap;

use crate::models::NormalizedSource;

/// Key two records must share to be treated as the same work
///
/// Lowercased DOI when present, else the comparison-normalized title.
pub fn dedup_key(source: &NormalizedSource) -> String {
    match source.doi.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(doi) => format!("doi:{}", doi.to_lowercase()),
        None => format!("title:{}", normalize_title(&source.title)),
    }
}

/// Normalize a title for comparison: lowercase, word characters only, single spaces
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse records sharing a dedup key in a single pass
///
/// Each group keeps the record with the strictly higher completeness; on a
/// tie the first one seen stays. Output order follows the first appearance
/// of each key.
pub fn deduplicate(sources: Vec<NormalizedSource>) -> Vec<NormalizedSource> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(sources.len());
    let mut kept: Vec<NormalizedSource> = Vec::with_capacity(sources.len());

    for source in sources {
        let key = dedup_key(&source);
        match index.get(&key) {
            Some(&slot) => {
                if source.completeness > kept[slot].completeness {
                    tracing::trace!(key = %key, from = %source.source_api, "replacing duplicate");
                    kept[slot] = source;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(source);
            }
        }
    }

    kept
}
