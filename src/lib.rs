//! Hierarchical configuration with path-addressed views and lazily built plugins.
//!
//! A [`Configuration`] holds a nested document. Keys are dotted paths
//! (`"db.pool.size"`). Reading a mapping returns a [`ConfigView`] that acts as
//! a configuration root of its own, and entries carrying a `class` can be
//! turned into live objects through the class registry.
pub mod document;
pub mod error;
pub mod object;
pub mod params;
pub mod path;
pub mod registry;
pub mod store;
pub mod view;

pub use error::Error;
pub use object::{ConfigObject, ConfigValue};
pub use params::Params;
pub use registry::{FromConfig, Plugin, RegisteredClass, Registry};
pub use store::{ConfigurationBuilder, Configuration, Format};
pub use view::ConfigView;

// re-export macro
pub use scoped_config_macros::Plugin;

#[doc(hidden)]
pub use inventory;
