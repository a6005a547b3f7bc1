use std::sync::Arc;

use scoped_config::{
    ConfigObject, ConfigValue, ConfigView, Configuration, Error, Format, FromConfig, Params, Plugin,
};
use serde_value::Value;

/// A database client built from its own configuration section.
#[derive(Debug, Plugin)]
#[plugin(class = "demo.Database")]
struct Database {
    config: ConfigView,
}

impl FromConfig for Database {
    fn from_config(config: ConfigView, _params: &Params) -> Result<Self, Error> {
        // Fill in defaults the deployment did not set.
        config.setdefault("port", Value::I64(5432))?;
        Ok(Self { config })
    }
}

impl Database {
    fn url(&self) -> Result<String, Error> {
        let host: String = self.config.get_as("host")?;
        let port: u16 = self.config.get_as("port")?;
        Ok(format!("postgres://{host}:{port}"))
    }
}

/// A service depending on the shared database instance.
#[derive(Debug, Plugin)]
#[plugin(class = "demo.Api")]
struct Api {
    name: String,
    db: Arc<Database>,
}

impl FromConfig for Api {
    fn from_config(config: ConfigView, params: &Params) -> Result<Self, Error> {
        let db = config.root().get_instance::<Database>("db", None, &Params::new())?;
        let name = params
            .get::<String>("name")
            .cloned()
            .unwrap_or_else(|| "api".to_string());
        Ok(Self { name, db })
    }
}

const CONFIG: &str = r#"
db:
  class: demo.Database
  host: localhost
api:
  class: demo.Api
  workers: 4
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Configuration::new();
    config.load_str(CONFIG, Format::Yaml, None)?;

    // Mappings come back as views that can be navigated further
    if let Some(ConfigValue::View(api)) = config.get("api") {
        println!("api section at {:?} has keys {:?}", api.path(), api.keys()?);
    }

    let api = config.get_instance::<Api>("api", None, &Params::new().with("name", "public".to_string()))?;
    println!("{} talks to {}", api.name, api.db.url()?);

    // The database was built once and shared
    let db = config.get_instance::<Database>("db", None, &Params::new())?;
    println!("shared database: {}", Arc::ptr_eq(&db, &api.db));

    println!("final document: {:#?}", config);
    Ok(())
}
