//! Loose field access over intermediate JSON records.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub(crate) type Record = Map<String, Value>;

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})\b").expect("static year pattern"))
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static markup pattern"))
}

/// Resolve `key` in `record`; dotted keys walk nested objects
pub(crate) fn lookup<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.first()?.as_object()?.get(part)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// First present, non-null value among `keys`
pub(crate) fn first_value<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| lookup(record, key))
}

/// Render a value as trimmed, non-empty text
///
/// Arrays yield their first renderable element; objects yield a name-like member.
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(text),
        Value::Object(map) => ["value", "name", "display_name", "title", "url", "content", "$"]
            .iter()
            .find_map(|k| map.get(*k).and_then(text)),
        Value::Bool(_) | Value::Null => None,
    }
}

/// First key among `keys` that renders as text
pub(crate) fn first_text(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| lookup(record, key).and_then(text))
}

pub(crate) fn first_bool(record: &Record, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| {
        lookup(record, key).and_then(|value| match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n == 1),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" | "open" => Some(true),
                "false" | "no" | "n" | "0" | "closed" => Some(false),
                _ => None,
            },
            _ => None,
        })
    })
}

pub(crate) fn first_u64(record: &Record, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        lookup(record, key).and_then(|value| match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    })
}

pub(crate) fn first_f64(record: &Record, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| {
        lookup(record, key).and_then(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    })
}

/// Strings from an array, or from a comma/semicolon separated string
pub(crate) fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        Value::String(s) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        other => text(other).into_iter().collect(),
    }
}

/// Collapse runs of whitespace (including newlines) to single spaces and trim
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop markup tags, then collapse whitespace
pub(crate) fn strip_markup(s: &str) -> String {
    collapse_whitespace(&markup_regex().replace_all(s, " "))
}

/// Four-digit year from a number, a date string, a date-parts array or a date object
pub(crate) fn extract_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .filter(|y| (1000..=9999).contains(y))
            .map(|y| y as i32),
        Value::String(s) => year_regex()
            .captures(s)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        Value::Array(items) => items.iter().find_map(extract_year),
        Value::Object(map) => ["date-parts", "year", "date-time", "date"]
            .iter()
            .find_map(|k| map.get(*k).and_then(extract_year)),
        Value::Bool(_) | Value::Null => None,
    }
}
