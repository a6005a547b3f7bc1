//! Dotted key resolution over a document tree.
//!
//! A key like `"db.pool.size"` names one mapping lookup per segment. Reads
//! treat a null at an intermediate segment exactly like a missing one, while a
//! null at the final segment is a real value. Writes create the missing
//! intermediate mappings and replace intermediate nulls with empty mappings.
use serde_value::Value;

use crate::{
    document::{self, Map},
    error::Error,
};

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Joins a view prefix and a key relative to it.
pub fn join(prefix: &str, key: &str) -> String {
    format!("{prefix}{SEPARATOR}{key}")
}

/// Splits a key into its parent segments and its final segment.
fn split(key: &str) -> (impl Iterator<Item = &str>, &str) {
    let (parents, last) = match key.rsplit_once(SEPARATOR) {
        Some((parents, last)) => (Some(parents), last),
        None => (None, key),
    };
    (parents.into_iter().flat_map(|p| p.split(SEPARATOR)), last)
}

/// Looks `key` up in `values`.
///
/// Returns `None` when any segment is missing, or when an intermediate
/// segment holds null or a scalar.
pub fn resolve<'a>(values: &'a Map, key: &str) -> Option<&'a Value> {
    let (parents, last) = split(key);

    let mut scope = values;
    for segment in parents {
        match scope.get(&document::key(segment)) {
            Some(Value::Map(map)) => scope = map,
            _ => return None,
        }
    }

    scope.get(&document::key(last))
}

/// Writes `data` at `key`, creating intermediate mappings on the way.
///
/// An intermediate segment holding null is replaced by a fresh mapping. An
/// intermediate segment holding any other scalar cannot be descended into and
/// yields [`Error::NotAMapping`] carrying the full key.
pub fn assign(values: &mut Map, key: &str, data: Value) -> Result<(), Error> {
    let (parents, last) = split(key);

    let mut scope = values;
    for segment in parents {
        let slot = scope
            .entry(document::key(segment))
            .or_insert_with(|| Value::Map(Map::new()));
        if document::is_null(slot) {
            *slot = Value::Map(Map::new());
        }
        scope = match slot {
            Value::Map(map) => map,
            _ => return Err(Error::NotAMapping(key.to_string())),
        };
    }

    scope.insert(document::key(last), data);
    Ok(())
}
