//! The read/write contract shared by [`Configuration`] and [`ConfigView`].
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_value::Value;

use crate::{
    document,
    error::Error,
    params::Params,
    registry::{self, Erased},
    store::Configuration,
    view::ConfigView,
};

/// Result of [`ConfigObject::get`].
///
/// Mapping values come back as a [`ConfigView`] bound to their path, so
/// callers can keep reading and writing below them. Anything else comes back
/// as the raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Value(Value),
    View(ConfigView),
}

impl ConfigValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Value(v) if document::is_null(v))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ConfigValue::Value(v) => Some(v),
            ConfigValue::View(_) => None,
        }
    }

    pub fn as_view(&self) -> Option<&ConfigView> {
        match self {
            ConfigValue::View(view) => Some(view),
            ConfigValue::Value(_) => None,
        }
    }

    pub fn into_view(self) -> Option<ConfigView> {
        match self {
            ConfigValue::View(view) => Some(view),
            ConfigValue::Value(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        ConfigValue::Value(value)
    }
}

impl From<ConfigView> for ConfigValue {
    fn from(view: ConfigView) -> Self {
        ConfigValue::View(view)
    }
}

/// Path-addressed access to a configuration scope.
///
/// Keys are dotted paths relative to the scope. The required methods carry
/// the store semantics; everything else is derived from them.
pub trait ConfigObject {
    /// The store every read and write ends up in.
    fn root(&self) -> &Configuration;

    /// Turns a key relative to this scope into a key relative to the root.
    fn qualify(&self, key: &str) -> String;

    /// Resolves `key` to its raw value.
    ///
    /// When the key cannot be resolved, returns `default` if one was given
    /// and [`Error::MissingKey`] otherwise. A null stored at the final
    /// segment is returned as is; a null at an intermediate segment counts as
    /// missing.
    fn get_raw_with(&self, key: &str, default: Option<Value>) -> Result<Value, Error>;

    /// Resolves `key`, wrapping mapping values in a view.
    ///
    /// Returns `None` when the key cannot be resolved.
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// Writes `value` at `key`, creating intermediate mappings as needed.
    fn set(&self, key: &str, value: Value) -> Result<(), Error>;

    /// Keys of the mapping this scope points at, read fresh on every call.
    fn keys(&self) -> Result<Vec<String>, Error>;

    fn get_raw(&self, key: &str) -> Result<Value, Error> {
        self.get_raw_with(key, None)
    }

    fn get_raw_or(&self, key: &str, default: Value) -> Value {
        self.get_raw(key).unwrap_or(default)
    }

    fn get_or(&self, key: &str, default: impl Into<ConfigValue>) -> ConfigValue
    where
        Self: Sized,
    {
        self.get(key).unwrap_or_else(|| default.into())
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn len(&self) -> Result<usize, Error> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// Returns the value at `key`, or stores and returns `default` when the
    /// key is missing or holds null.
    fn setdefault(&self, key: &str, default: Value) -> Result<ConfigValue, Error> {
        match self.get(key) {
            Some(value) if !value.is_null() => Ok(value),
            _ => {
                self.set(key, default.clone())?;
                Ok(ConfigValue::Value(default))
            }
        }
    }

    /// Deserializes the raw value at `key` into `T`.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, Error>
    where
        Self: Sized,
    {
        let value = self.get_raw(key)?;
        Ok(T::deserialize(value)?)
    }

    /// Serializes `value` and stores it at `key`.
    fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error>
    where
        Self: Sized,
    {
        let value = serde_value::to_value(value)?;
        self.set(key, value)
    }

    /// Builds a new object from the entry at `key`.
    ///
    /// The entry's `class` names the registered type, falling back to
    /// `default_class`. The type's [`FromConfig::from_config`](crate::FromConfig::from_config)
    /// receives a view over the entry plus `params`. Nothing is cached; see
    /// [`Configuration::get_instance`] for the cached variant.
    fn create_instance<T>(
        &self,
        key: &str,
        default_class: Option<&str>,
        params: &Params,
    ) -> Result<Arc<T>, Error>
    where
        Self: Sized,
        T: ?Sized + 'static,
    {
        let (class, erased) = instantiate(self, key, default_class, params)?;
        registry::downcast::<T>(&class, &erased)
    }
}

/// Resolves the class for the entry at `key` and runs its factory.
pub(crate) fn instantiate<O: ConfigObject + ?Sized>(
    scope: &O,
    key: &str,
    default_class: Option<&str>,
    params: &Params,
) -> Result<(String, Erased), Error> {
    let view = match scope.get(key) {
        Some(ConfigValue::View(view)) => view,
        Some(value) if !value.is_null() => return Err(Error::NotAMapping(scope.qualify(key))),
        _ => ConfigView::new(scope.root().clone(), scope.qualify(key)),
    };

    let class = match view.get_raw_or("class", Value::Unit) {
        Value::String(class) => class,
        value if document::is_null(&value) => default_class
            .map(str::to_string)
            .ok_or_else(|| Error::MissingClass(view.path().to_string()))?,
        _ => return Err(Error::InvalidClass(view.path().to_string())),
    };

    tracing::debug!(key = %view.path(), class = %class, "Creating instance");
    let erased = scope.root().registry().build(&class, view, params)?;

    Ok((class, erased))
}
