//! Input normalization
//!
//! Hosts hand processors their table in several shapes. Everything is reduced
//! to a flat list of query strings, one per row, in input order.

use serde_json::Value;

/// Default agent count when the host leaves the field empty
pub const DEFAULT_AGENT_COUNT: usize = 3;

/// Extract one query string per row from a host-supplied table
///
/// Accepted shapes:
/// - `{"data": [{"text": ..}, ..]}` (entries without `text` are skipped)
/// - `{"text": [..]}`
/// - `[..]`
/// - any other scalar becomes a single row; `null` yields no rows
///
/// Objects without a `data` list or a `text` list yield no rows.
pub fn extract_text_values(input: &Value) -> Vec<String> {
    match input {
        Value::Null => Vec::new(),
        Value::Object(map) => match (map.get("data"), map.get("text")) {
            (Some(Value::Array(records)), _) => records.iter().filter_map(record_text).collect(),
            (_, Some(Value::Array(column))) => column.iter().map(value_to_text).collect(),
            _ => Vec::new(),
        },
        Value::Array(items) => items.iter().map(value_to_text).collect(),
        scalar => vec![value_to_text(scalar)],
    }
}

/// A single record of a data list
fn record_text(record: &Value) -> Option<String> {
    match record {
        Value::Object(fields) => fields.get("text").map(value_to_text),
        Value::Null => None,
        other => Some(value_to_text(other)),
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a host-supplied worker count; empty, invalid or zero falls back to `default`
pub fn parse_max_workers(raw: Option<&str>, default: usize) -> usize {
    parse_positive(raw).unwrap_or(default)
}

/// Parse a host-supplied agent count, defaulting to [`DEFAULT_AGENT_COUNT`]
pub fn parse_agent_count(raw: Option<&str>) -> usize {
    parse_positive(raw).unwrap_or(DEFAULT_AGENT_COUNT)
}

pub(crate) fn parse_positive(raw: Option<&str>) -> Option<usize> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
}
