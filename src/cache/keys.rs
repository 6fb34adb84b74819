//! Key Construction Helpers
//!
//! Pure functions mapping logically identical requests onto the same cache key.

use std::borrow::Cow;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Builds the key for an API request.
///
/// Object keys in `params` are sorted at every depth, so parameter order
/// never changes the result.
pub fn build_request_key(method: &str, url: &str, params: &Value) -> String {
    with_params(
        format!("{}:{}", escape_field(&method.to_uppercase()), escape_field(url)),
        params,
    )
}

/// Builds the key for data owned by a user, e.g. computed statistics.
pub fn build_owner_key(owner_id: &str, data_type: &str, params: &Value) -> String {
    with_params(
        format!("owner:{}:{}", escape_field(owner_id), escape_field(data_type)),
        params,
    )
}

/// Percent-escapes `%` and `:` so a field never contains the separator.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(['%', ':']) {
        Cow::Owned(field.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(field)
    }
}

fn with_params(base: String, params: &Value) -> String {
    match params {
        Value::Null => base,
        Value::Object(map) if map.is_empty() => base,
        other => {
            let params =
                serde_json::to_string(&Canonical(other)).unwrap_or_else(|_| other.to_string());
            format!("{}:{}", base, params)
        }
    }
}

/// Serializes a JSON value with object keys in sorted order at every depth,
/// whatever map ordering serde_json was built with.
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));

                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &Canonical(value))?;
                }
                out.end()
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical)),
            other => other.serialize(serializer),
        }
    }
}
