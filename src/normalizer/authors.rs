//! Author parsing across the name shapes providers use.

use serde_json::Value;

use super::fields::{collapse_whitespace, first_text, first_value, text, Record};
use crate::models::Author;

const GIVEN_KEYS: &[&str] = &[
    "given",
    "firstName",
    "first_name",
    "givenName",
    "given_name",
    "forename",
    "ForeName",
];
const FAMILY_KEYS: &[&str] = &[
    "family",
    "lastName",
    "last_name",
    "familyName",
    "family_name",
    "surname",
    "LastName",
];
const FULL_KEYS: &[&str] = &[
    "fullName",
    "full_name",
    "FullName",
    "name",
    "display_name",
    "displayName",
    "literal",
];
const ORCID_KEYS: &[&str] = &["orcid", "ORCID", "orcidId", "orcid_id"];
const AFFILIATION_KEYS: &[&str] = &[
    "affiliation",
    "affiliations",
    "institution",
    "institutions",
    "raw_affiliation_strings",
];

/// Parse every author in `value`, dropping entries without any name
///
/// A bare string may hold several authors separated by semicolons.
pub(crate) fn normalize_authors(value: Option<&Value>) -> Vec<Author> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(parse_author).collect(),
        Some(Value::String(s)) => s.split(';').filter_map(parse_name).collect(),
        Some(value @ Value::Object(_)) => parse_author(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn parse_author(value: &Value) -> Option<Author> {
    match value {
        Value::String(s) => parse_name(s),
        Value::Object(map) => parse_structured(map),
        _ => None,
    }
}

fn parse_structured(map: &Record) -> Option<Author> {
    // OpenAlex-style wrapper: {"author": {...}, "institutions": [...]}
    if let Some(Value::Object(inner)) = map.get("author") {
        let mut author = parse_structured(inner)?;
        if author.affiliation.is_none() {
            author.affiliation = first_text(map, AFFILIATION_KEYS);
        }
        return Some(author);
    }

    let given = first_text(map, GIVEN_KEYS).map(|s| collapse_whitespace(&s));
    let family = first_text(map, FAMILY_KEYS).map(|s| collapse_whitespace(&s));
    let full = first_text(map, FULL_KEYS).map(|s| collapse_whitespace(&s));

    let mut author = match (given, family, full) {
        (None, None, None) => return None,
        (None, None, Some(full)) => parse_name(&full)?,
        (given, family, full) => {
            let full = full.or_else(|| match (&given, &family) {
                (Some(g), Some(f)) => Some(format!("{} {}", g, f)),
                (Some(g), None) => Some(g.clone()),
                (None, Some(f)) => Some(f.clone()),
                (None, None) => None,
            });
            Author {
                first_name: given,
                last_name: family,
                full_name: full,
                ..Default::default()
            }
        }
    };

    author.orcid = first_text(map, ORCID_KEYS).map(|o| clean_orcid(&o));
    author.affiliation = first_value(map, AFFILIATION_KEYS).and_then(text);
    Some(author)
}

/// Parse "Last, First" or "First Last"
fn parse_name(raw: &str) -> Option<Author> {
    let name = collapse_whitespace(raw);
    if name.is_empty() {
        return None;
    }

    if let Some((last, first)) = name.split_once(',') {
        let last = last.trim();
        let first = first.trim();
        if last.is_empty() {
            return parse_name(first);
        }
        let full = if first.is_empty() {
            last.to_string()
        } else {
            format!("{} {}", first, last)
        };
        return Some(Author {
            first_name: (!first.is_empty()).then(|| first.to_string()),
            last_name: Some(last.to_string()),
            full_name: Some(full),
            ..Default::default()
        });
    }

    let mut parts: Vec<&str> = name.split(' ').collect();
    let last = parts.pop()?;
    let first = parts.join(" ");
    Some(Author {
        first_name: (!first.is_empty()).then_some(first),
        last_name: Some(last.to_string()),
        full_name: Some(name.clone()),
        ..Default::default()
    })
}

fn clean_orcid(orcid: &str) -> String {
    orcid
        .trim()
        .trim_start_matches("https://orcid.org/")
        .trim_start_matches("http://orcid.org/")
        .to_string()
}
