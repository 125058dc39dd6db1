//! Field quality classifier

use pms_domain::constants::PLACEHOLDER_SENTINELS;
use serde_json::Value;

/// True when a stored string carries no information.
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || PLACEHOLDER_SENTINELS.iter().any(|sentinel| sentinel.eq_ignore_ascii_case(trimmed))
}

/// Decide whether a stored report value must be replaced by a fallback.
///
/// `None` stands for a field that is absent from the report altogether.
/// Numbers and booleans are always usable, `0` and `false` included.
pub fn requires_fallback(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => is_placeholder(text),
        Some(Value::Array(items)) => {
            items.is_empty() || items.iter().all(|item| requires_fallback(Some(item)))
        }
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Number(_) | Value::Bool(_)) => false,
    }
}
