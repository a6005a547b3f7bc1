//! Integration tests for building and caching plugin instances.

use scoped_config::{
    ConfigObject, ConfigValue, ConfigView, Configuration, Error, Format, FromConfig, Params,
    Plugin, submit_class,
};
use serde_value::Value;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

fn values(yaml: &str) -> Value {
    Format::Yaml.parse_str(yaml).expect("Failed to parse YAML")
}

fn store(yaml: &str) -> Configuration {
    Configuration::from_values(values(yaml)).expect("Failed to create store")
}

#[derive(Debug, Plugin)]
#[plugin(class = "mymodule.PgStore")]
struct PgStore {
    config: ConfigView,
    host: String,
}

impl FromConfig for PgStore {
    fn from_config(config: ConfigView, _params: &Params) -> Result<Self, Error> {
        let host = config.get_as("host")?;
        Ok(Self { config, host })
    }
}

/// Counts how often it was built; registered through `submit_class!`.
#[derive(Debug)]
struct Counter {
    label: String,
}

static COUNTER_BUILDS: AtomicUsize = AtomicUsize::new(0);

impl FromConfig for Counter {
    fn from_config(config: ConfigView, params: &Params) -> Result<Self, Error> {
        COUNTER_BUILDS.fetch_add(1, Ordering::SeqCst);
        let label = params
            .get::<String>("label")
            .cloned()
            .unwrap_or_else(|| config.path().to_string());
        Ok(Self { label })
    }
}

submit_class!("tests.Counter", Counter);

#[derive(Debug, Plugin)]
struct Broken;

impl FromConfig for Broken {
    fn from_config(_config: ConfigView, _params: &Params) -> Result<Self, Error> {
        Err(Error::plugin("cannot connect"))
    }
}

#[derive(Plugin)]
#[plugin(class = "tests.Service")]
struct Service {
    db: Arc<PgStore>,
}

impl FromConfig for Service {
    fn from_config(config: ConfigView, params: &Params) -> Result<Self, Error> {
        let db = config.root().get_instance::<PgStore>("db", None, params)?;
        Ok(Self { db })
    }
}

#[test]
fn test_create_instance_passes_view_of_entry() {
    let config = store(
        r#"
db:
  class: mymodule.PgStore
  host: x
"#,
    );

    let db = config
        .create_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to create instance");

    assert_eq!(db.host, "x");
    assert_eq!(db.config.path(), "db");
    assert_eq!(db.config.get("host"), Some(ConfigValue::Value(Value::String("x".into()))));
}

#[test]
fn test_instance_keeps_reading_live_settings() {
    let config = store(
        r#"
db:
  class: mymodule.PgStore
  host: x
"#,
    );

    let db = config
        .create_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to create instance");
    config.set("db.port", Value::I64(5432)).expect("Failed to set");

    assert_eq!(db.config.get_raw("port").unwrap(), Value::I64(5432));
}

#[test]
fn test_plugin_derive_sets_class_name() {
    assert_eq!(PgStore::CLASS, "mymodule.PgStore");
    assert_eq!(Broken::CLASS, "Broken");
    assert!(Configuration::new().registry().contains("tests.Service"));
}

#[test]
fn test_create_instance_is_not_cached() {
    let config = store(
        r#"
db:
  class: mymodule.PgStore
  host: x
"#,
    );

    let first = config
        .create_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to create instance");
    let second = config
        .create_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to create instance");

    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_get_instance_caches_by_key() {
    let config = store(
        r#"
db:
  class: mymodule.PgStore
  host: x
"#,
    );

    let first = config
        .get_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to get instance");

    config.set("db.host", Value::String("y".into())).expect("Failed to set");

    let second = config
        .get_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to get instance");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.host, "x");
}

#[test]
fn test_get_instance_ignores_later_params() {
    let config = store("counter: {class: tests.Counter}");

    let first = config
        .get_instance::<Counter>("counter", None, &Params::new().with("label", "first".to_string()))
        .expect("Failed to get instance");
    let second = config
        .get_instance::<Counter>("counter", None, &Params::new().with("label", "second".to_string()))
        .expect("Failed to get instance");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.label, "first");
}

#[test]
fn test_cache_is_per_store() {
    let before = COUNTER_BUILDS.load(Ordering::SeqCst);
    let first = store("counter: {class: tests.Counter}");
    let second = store("counter: {class: tests.Counter}");

    let a = first
        .get_instance::<Counter>("counter", None, &Params::new())
        .expect("Failed to get instance");
    let b = second
        .get_instance::<Counter>("counter", None, &Params::new())
        .expect("Failed to get instance");
    first
        .get_instance::<Counter>("counter", None, &Params::new())
        .expect("Failed to get instance");

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(COUNTER_BUILDS.load(Ordering::SeqCst) >= before + 2);
}

#[test]
fn test_default_class_for_absent_entry() {
    let config = Configuration::new();

    let counter = config
        .create_instance::<Counter>("metrics.counter", Some("tests.Counter"), &Params::new())
        .expect("Failed to create instance");

    assert_eq!(counter.label, "metrics.counter");
}

#[test]
fn test_default_class_when_class_is_missing_or_null() {
    let config = store(
        r#"
plain:
  label: ignored
nulled:
  class: ~
"#,
    );

    let plain = config
        .create_instance::<Counter>("plain", Some("tests.Counter"), &Params::new())
        .expect("Failed to create instance");
    assert_eq!(plain.label, "plain");

    let nulled = config
        .create_instance::<Counter>("nulled", Some("tests.Counter"), &Params::new())
        .expect("Failed to create instance");
    assert_eq!(nulled.label, "nulled");
}

#[test]
fn test_configured_class_wins_over_default() {
    let config = store(
        r#"
db:
  class: mymodule.PgStore
  host: x
"#,
    );

    let db = config
        .create_instance::<PgStore>("db", Some("tests.Counter"), &Params::new())
        .expect("Failed to create instance");
    assert_eq!(db.host, "x");
}

#[test]
fn test_create_instance_from_view() {
    let config = store(
        r#"
services:
  db:
    class: mymodule.PgStore
    host: nested
"#,
    );
    let services = config
        .get("services")
        .and_then(ConfigValue::into_view)
        .expect("Expected a view");

    let db = services
        .create_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to create instance");
    assert_eq!(db.host, "nested");
    assert_eq!(db.config.path(), "services.db");
}

#[test]
fn test_unresolved_class() {
    let config = store("thing: {class: nope.Missing}");

    let err = config
        .create_instance::<PgStore>("thing", None, &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnresolvedClass(ref class) if class == "nope.Missing"));
}

#[test]
fn test_missing_class_without_default() {
    let config = store("thing: {host: x}");

    let err = config
        .create_instance::<PgStore>("thing", None, &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::MissingClass(ref key) if key == "thing"));
}

#[test]
fn test_invalid_class_reference() {
    let config = store("thing: {class: 42}");

    let err = config
        .create_instance::<PgStore>("thing", None, &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidClass(ref key) if key == "thing"));
}

#[test]
fn test_scalar_entry_is_not_instantiable() {
    let config = store("thing: text");

    let err = config
        .create_instance::<PgStore>("thing", Some("mymodule.PgStore"), &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::NotAMapping(ref key) if key == "thing"));
}

#[test]
fn test_construction_errors_propagate_unchanged() {
    let config = store("broken: {class: Broken}");

    let err = config
        .get_instance::<Broken>("broken", None, &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::Plugin(_)));
    assert_eq!(err.to_string(), "Plugin: cannot connect");

    // Errors raised by the plugin's own config reads pass through too.
    let config = store("db: {class: mymodule.PgStore}");
    let err = config
        .create_instance::<PgStore>("db", None, &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::MissingKey(ref key) if key == "db.host"));
}

#[test]
fn test_failed_construction_is_not_cached() {
    let config = store("db: {class: mymodule.PgStore}");

    assert!(config.get_instance::<PgStore>("db", None, &Params::new()).is_err());

    config.set("db.host", Value::String("x".into())).expect("Failed to set");
    let db = config
        .get_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to get instance");
    assert_eq!(db.host, "x");
}

#[test]
fn test_instance_type_mismatch() {
    let config = store(
        r#"
db:
  class: mymodule.PgStore
  host: x
"#,
    );

    let err = config
        .create_instance::<Counter>("db", None, &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::InstanceType { ref class, .. } if class == "mymodule.PgStore"));

    config
        .get_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to get instance");
    let err = config
        .get_instance::<Counter>("db", None, &Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::InstanceType { .. }));
}

#[test]
fn test_dependencies_resolve_through_the_cache() {
    let config = store(
        r#"
db:
  class: mymodule.PgStore
  host: x
api:
  class: tests.Service
"#,
    );

    let api = config
        .get_instance::<Service>("api", None, &Params::new())
        .expect("Failed to get instance");
    let db = config
        .get_instance::<PgStore>("db", None, &Params::new())
        .expect("Failed to get instance");

    assert!(Arc::ptr_eq(&api.db, &db));
}

trait Store: Send + Sync {
    fn describe(&self) -> String;
}

struct MemoryStore {
    capacity: u32,
}

impl FromConfig for MemoryStore {
    fn from_config(config: ConfigView, _params: &Params) -> Result<Self, Error> {
        let capacity = config.get_as("capacity")?;
        Ok(Self { capacity })
    }
}

impl Store for MemoryStore {
    fn describe(&self) -> String {
        format!("memory({})", self.capacity)
    }
}

impl Store for PgStore {
    fn describe(&self) -> String {
        format!("pg({})", self.host)
    }
}

#[test]
fn test_store_local_registrations() {
    let config = Configuration::builder()
        .register_with("stores.Memory", |config, params| {
            Ok(Arc::new(MemoryStore::from_config(config, params)?) as Arc<dyn Store>)
        })
        .register_with("stores.Pg", |config, params| {
            Ok(Arc::new(PgStore::from_config(config, params)?) as Arc<dyn Store>)
        })
        .register::<MemoryStore>("stores.PlainMemory")
        .build_with(values(
            r#"
primary:
  class: stores.Pg
  host: db1
fallback:
  class: stores.Memory
  capacity: 64
plain:
  class: stores.PlainMemory
  capacity: 8
"#,
        ))
        .expect("Failed to create store");

    let primary = config
        .get_instance::<dyn Store>("primary", None, &Params::new())
        .expect("Failed to get instance");
    let fallback = config
        .get_instance::<dyn Store>("fallback", None, &Params::new())
        .expect("Failed to get instance");
    let plain = config
        .create_instance::<MemoryStore>("plain", None, &Params::new())
        .expect("Failed to create instance");

    assert_eq!(primary.describe(), "pg(db1)");
    assert_eq!(fallback.describe(), "memory(64)");
    assert_eq!(plain.capacity, 8);

    assert!(config.registry().contains("stores.Pg"));
    assert!(!Configuration::new().registry().contains("stores.Pg"));
}

#[test]
fn test_local_registration_shadows_global() {
    let config = Configuration::builder()
        .register::<Counter>("mymodule.PgStore")
        .build_with(values("db: {class: mymodule.PgStore}"))
        .expect("Failed to create store");

    let counter = config
        .create_instance::<Counter>("db", None, &Params::new())
        .expect("Failed to create instance");
    assert_eq!(counter.label, "db");
}
