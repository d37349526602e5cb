//! Defensive field extraction from provider JSON

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Read a decimal that may arrive as a JSON number or as text
///
/// Text may carry surrounding whitespace, a trailing `%` or thousands
/// separators. Placeholders such as `"None"` or `"-"` yield `None`.
pub(crate) fn decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => decimal_text(&n.to_string()),
        Value::String(s) => decimal_text(s),
        _ => None,
    }
}

pub(crate) fn decimal_text(text: &str) -> Option<Decimal> {
    let cleaned = text.trim().trim_end_matches('%').trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Read a non-blank string field
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Provider error message embedded in a 200 response, if any
pub(crate) fn error_message<'a>(body: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
}

/// True when a provider message is about the API key
pub(crate) fn mentions_api_key(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("api key") || lower.contains("apikey") || lower.contains("api_key")
}
