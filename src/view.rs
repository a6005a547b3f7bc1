use serde_value::Value;

use crate::{
    document,
    error::Error,
    object::{ConfigObject, ConfigValue},
    path,
    store::Configuration,
};

/// A subtree of a [`Configuration`] that behaves like a root of its own.
///
/// A view is just a root handle plus a path prefix. It owns no data and
/// caches nothing: every call prefixes the key and forwards to the root, so
/// views over the same or overlapping paths see each other's writes
/// immediately.
#[derive(Clone)]
pub struct ConfigView {
    root: Configuration,
    path: String,
}

impl ConfigView {
    pub(crate) fn new(root: Configuration, path: impl Into<String>) -> Self {
        Self {
            root,
            path: path.into(),
        }
    }

    /// The dotted path of this view relative to the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw mapping currently stored at this view's path.
    pub fn values(&self) -> Result<Value, Error> {
        self.root.get_raw(&self.path)
    }
}

impl ConfigObject for ConfigView {
    fn root(&self) -> &Configuration {
        &self.root
    }

    fn qualify(&self, key: &str) -> String {
        path::join(&self.path, key)
    }

    fn get_raw_with(&self, key: &str, default: Option<Value>) -> Result<Value, Error> {
        self.root.get_raw_with(&self.qualify(key), default)
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.root.get(&self.qualify(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.root.set(&self.qualify(key), value)
    }

    fn keys(&self) -> Result<Vec<String>, Error> {
        match self.root.get_raw(&self.path)? {
            Value::Map(map) => Ok(document::string_keys(&map)),
            _ => Err(Error::NotAMapping(self.path.clone())),
        }
    }
}

impl PartialEq for ConfigView {
    fn eq(&self, other: &Self) -> bool {
        self.root.same_root(&other.root) && self.path == other.path
    }
}

impl std::fmt::Debug for ConfigView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigView")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
