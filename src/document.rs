//! Helpers around the document tree held by a [`Configuration`](crate::Configuration).
//!
//! Documents are plain [`serde_value::Value`] trees. Mappings are
//! [`Value::Map`] keyed by [`Value::String`] and null is [`Value::Unit`].
//! Everything that enters the store goes through [`normalize`] first so the
//! rest of the crate only has to deal with that one spelling of null.
use std::collections::BTreeMap;

use serde_value::Value;

/// A mapping node of the document tree.
pub type Map = BTreeMap<Value, Value>;

/// Collapses the wrapper variants `serde_value` produces for `Option` and
/// newtype values so the tree only contains plain scalars, sequences and maps.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Option(None) => Value::Unit,
        Value::Option(Some(inner)) | Value::Newtype(inner) => normalize(*inner),
        Value::Seq(items) => Value::Seq(items.into_iter().map(normalize).collect()),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (normalize(k), normalize(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Returns `true` for the null value.
pub fn is_null(value: &Value) -> bool {
    matches!(value, Value::Unit | Value::Option(None))
}

/// Builds the map key for one path segment.
pub(crate) fn key(segment: &str) -> Value {
    Value::String(segment.to_string())
}

/// Lists the string keys of a mapping in its natural order.
pub(crate) fn string_keys(map: &Map) -> Vec<String> {
    map.keys()
        .filter_map(|k| match k {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}
