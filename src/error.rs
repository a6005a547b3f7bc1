use thiserror::Error;

/// Boxed error type plugins can use to report construction failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization: {0}")]
    Serialization(#[from] serde_value::SerializerError),

    #[error("Deserialization: {0}")]
    Deserialization(#[from] serde_value::DeserializerError),

    #[error("YAML Deserialization: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML Deserialization: {0}")]
    TomlDeserialization(#[from] toml::de::Error),

    /// A dotted key could not be resolved and no default was supplied.
    ///
    /// The contained string is always the full key that was requested, never
    /// the segment where the lookup stopped.
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// A value that has to be a mapping is something else.
    ///
    /// Returned when writing through a scalar path segment, when loading a
    /// document whose top level is not a mapping, or when listing the keys of
    /// a view whose path holds a scalar.
    #[error("Not a mapping: {0}")]
    NotAMapping(String),

    /// A class reference was not found in the registry.
    ///
    /// # How to Fix
    ///
    /// Register the type before asking for it, either globally:
    ///
    /// ```rust,ignore
    /// scoped_config::submit_class!("mymodule.PgStore", PgStore);
    /// ```
    ///
    /// or on the store itself:
    ///
    /// ```rust,ignore
    /// let config = Configuration::builder()
    ///     .register::<PgStore>("mymodule.PgStore")
    ///     .build();
    /// ```
    #[error("Class not registered: {0}")]
    UnresolvedClass(String),

    /// Neither the configuration entry nor the caller named a class.
    #[error("No class configured for: {0}")]
    MissingClass(String),

    /// The `class` entry exists but is not a string.
    #[error("Invalid class reference at: {0}")]
    InvalidClass(String),

    /// The registered factory produced something other than the requested type.
    #[error("Class {class} does not produce {expected}")]
    InstanceType {
        class: String,
        expected: &'static str,
    },

    /// Failure reported by a plugin's own construction code.
    #[error("Plugin: {0}")]
    Plugin(#[source] BoxError),
}

impl Error {
    /// Wraps an arbitrary error raised while a plugin builds itself.
    pub fn plugin(err: impl Into<BoxError>) -> Self {
        Error::Plugin(err.into())
    }
}
