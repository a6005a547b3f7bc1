//! The root configuration store.
//!
//! [`Configuration`] owns the document tree and the instance cache. Every
//! [`ConfigView`] handed out by it forwards back here, so this is the only
//! place where keys are actually resolved.
//!
//! # Example
//!
//! ```rust
//! use scoped_config::{ConfigObject, ConfigValue, Configuration, Format};
//! use serde_value::Value;
//!
//! # fn main() -> Result<(), scoped_config::Error> {
//! let config = Configuration::new();
//! config.load_str("db:\n  host: localhost\n", Format::Yaml, None)?;
//!
//! let db = config.get("db").and_then(ConfigValue::into_view).unwrap();
//! assert_eq!(db.get_raw("host")?, Value::String("localhost".into()));
//!
//! db.set("port", Value::I64(5432))?;
//! assert_eq!(config.get_raw("db.port")?, Value::I64(5432));
//! # Ok(())
//! # }
//! ```
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use serde_value::Value;

use crate::{
    document::{self, Map},
    error::Error,
    object::{self, ConfigObject, ConfigValue},
    params::Params,
    path,
    registry::{self, Erased, FromConfig, Registry},
    view::ConfigView,
};

/// Serialized formats a document can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Yaml,
    Toml,
}

impl Format {
    /// Picks the format from a file extension: `.toml` is TOML, anything else YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }

    pub fn parse_str(self, contents: &str) -> Result<Value, Error> {
        let value = match self {
            Format::Yaml => serde_yaml::from_str(contents)?,
            Format::Toml => toml::from_str(contents)?,
        };
        Ok(document::normalize(value))
    }

    pub fn parse_reader(self, mut reader: impl Read) -> Result<Value, Error> {
        match self {
            Format::Yaml => Ok(document::normalize(serde_yaml::from_reader(reader)?)),
            Format::Toml => {
                let mut contents = String::new();
                reader.read_to_string(&mut contents)?;
                self.parse_str(&contents)
            }
        }
    }
}

struct Shared {
    values: RwLock<Map>,
    instances: Mutex<HashMap<String, (String, Erased)>>,
    registry: Registry,
}

/// The root of a configuration tree.
///
/// `Configuration` is a cheap handle: clones share the same document, the
/// same instance cache and the same registry. Views keep such a clone.
///
/// # Lifecycle
///
/// 1. **Create**: [`new`](Configuration::new), [`from_values`](Configuration::from_values)
///    or [`builder`](Configuration::builder) when classes have to be registered
/// 2. **Fill**: [`load_file`](Configuration::load_file), [`load_str`](Configuration::load_str),
///    [`update`](Configuration::update) or plain [`set`](ConfigObject::set)
/// 3. **Read**: [`get`](ConfigObject::get) and [`get_raw`](ConfigObject::get_raw)
/// 4. **Instantiate**: [`get_instance`](Configuration::get_instance)
///
/// # Concurrency
///
/// Each operation locks internally, but sequences of operations are not
/// atomic. Callers mutating the tree from several threads must coordinate
/// among themselves.
#[derive(Clone)]
pub struct Configuration {
    shared: Arc<Shared>,
}

impl Configuration {
    /// Creates an empty store that only resolves globally registered classes.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Creates a store from an already parsed document.
    ///
    /// `values` must be a mapping or null.
    pub fn from_values(values: Value) -> Result<Self, Error> {
        Self::builder().build_with(values)
    }

    pub(crate) fn same_root(&self, other: &Configuration) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// Snapshot of the whole document.
    pub fn values(&self) -> Value {
        Value::Map(self.shared.values.read().clone())
    }

    /// Reads `filename` and loads it with [`load_reader`](Configuration::load_reader).
    ///
    /// The format is chosen with [`Format::from_path`].
    pub fn load_file(&self, filename: impl AsRef<Path>, sections: Option<&[&str]>) -> Result<(), Error> {
        let filename = filename.as_ref();
        tracing::debug!(file = %filename.display(), "Loading configuration file");

        let file = File::open(filename)?;
        self.load_reader(BufReader::new(file), Format::from_path(filename), sections)
    }

    pub fn load_reader(&self, reader: impl Read, format: Format, sections: Option<&[&str]>) -> Result<(), Error> {
        let document = format.parse_reader(reader)?;
        self.load_value(document, sections)
    }

    pub fn load_str(&self, contents: &str, format: Format, sections: Option<&[&str]>) -> Result<(), Error> {
        let document = format.parse_str(contents)?;
        self.load_value(document, sections)
    }

    /// Replaces top-level sections with the ones from `document`.
    ///
    /// Each section of the document replaces the section of the same name
    /// wholesale; nothing is merged below the top level. With `sections` set,
    /// only the listed section names are taken from the document. A null
    /// document loads nothing.
    pub fn load_value(&self, document: Value, sections: Option<&[&str]>) -> Result<(), Error> {
        let document = into_map(document::normalize(document), "document")?;

        let mut values = self.shared.values.write();
        for (section, value) in document {
            let wanted = match (&section, sections) {
                (_, None) => true,
                (Value::String(name), Some(sections)) => sections.contains(&name.as_str()),
                (_, Some(_)) => false,
            };
            if !wanted {
                continue;
            }

            tracing::debug!(section = ?section, "Loaded configuration section");
            values.insert(section, value);
        }

        Ok(())
    }

    /// Shallow merge of `data` into the top level.
    ///
    /// Nested mappings in `data` replace the existing ones wholesale.
    pub fn update(&self, data: Value) -> Result<(), Error> {
        let data = into_map(document::normalize(data), "update")?;
        self.shared.values.write().extend(data);
        Ok(())
    }

    /// Like [`create_instance`](ConfigObject::create_instance), but caches
    /// the result under `key`.
    ///
    /// The first successful call for a key builds the object; every later
    /// call with the same key returns that same object, regardless of
    /// `default_class`, `params`, or later changes to the configuration.
    pub fn get_instance<T>(&self, key: &str, default_class: Option<&str>, params: &Params) -> Result<Arc<T>, Error>
    where
        T: ?Sized + 'static,
    {
        {
            let instances = self.shared.instances.lock();
            if let Some((class, erased)) = instances.get(key) {
                tracing::trace!(key, "Instance cache hit");
                return registry::downcast::<T>(class, erased);
            }
        }

        // Built without holding the lock so factories can pull in their own
        // dependencies through this store.
        let (class, erased) = object::instantiate(self, key, default_class, params)?;

        let mut instances = self.shared.instances.lock();
        let (class, erased) = instances
            .entry(key.to_string())
            .or_insert((class, erased));
        registry::downcast::<T>(class, erased)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigObject for Configuration {
    fn root(&self) -> &Configuration {
        self
    }

    fn qualify(&self, key: &str) -> String {
        key.to_string()
    }

    fn get_raw_with(&self, key: &str, default: Option<Value>) -> Result<Value, Error> {
        let values = self.shared.values.read();
        match (path::resolve(&values, key), default) {
            (Some(value), _) => Ok(value.clone()),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(Error::MissingKey(key.to_string())),
        }
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        match self.get_raw(key) {
            Ok(Value::Map(_)) => Some(ConfigValue::View(ConfigView::new(self.clone(), key))),
            Ok(value) => Some(ConfigValue::Value(value)),
            Err(_) => None,
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        let value = document::normalize(value);
        path::assign(&mut self.shared.values.write(), key, value)
    }

    fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(document::string_keys(&self.shared.values.read()))
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("values", &*self.shared.values.read())
            .finish()
    }
}

/// Builder for a [`Configuration`] with its own class registrations.
///
/// ```rust,ignore
/// let config = Configuration::builder()
///     .register::<PgStore>("mymodule.PgStore")
///     .build_with(values)?;
/// ```
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    registry: Registry,
}

impl ConfigurationBuilder {
    pub fn register<T: FromConfig>(mut self, name: impl Into<String>) -> Self {
        self.registry.register::<T>(name);
        self
    }

    /// See [`Registry::register_with`].
    pub fn register_with<T, F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(ConfigView, &Params) -> Result<Arc<T>, Error> + Send + Sync + 'static,
    {
        self.registry.register_with(name, factory);
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Configuration {
        self.init(Map::new())
    }

    /// Builds the store with `values` as its initial document.
    pub fn build_with(self, values: Value) -> Result<Configuration, Error> {
        let values = into_map(document::normalize(values), "values")?;
        Ok(self.init(values))
    }

    fn init(self, values: Map) -> Configuration {
        Configuration {
            shared: Arc::new(Shared {
                values: RwLock::new(values),
                instances: Mutex::new(HashMap::new()),
                registry: self.registry,
            }),
        }
    }
}

fn into_map(value: Value, what: &str) -> Result<Map, Error> {
    match value {
        Value::Map(map) => Ok(map),
        Value::Unit => Ok(Map::new()),
        _ => Err(Error::NotAMapping(what.to_string())),
    }
}
