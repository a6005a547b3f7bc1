//! Class registry used to turn `class` references into live objects.
//!
//! Configuration entries name their implementation with a dotted string such
//! as `"mymodule.PgStore"`. Rust cannot look a type up by such a string, so
//! every constructible type has to be registered under its name up front,
//! either globally through [`inventory`] ([`submit_class!`](crate::submit_class)
//! or `#[derive(Plugin)]`) or on a single store through
//! [`ConfigurationBuilder`](crate::ConfigurationBuilder).
use std::{any::Any, collections::HashMap, sync::Arc};

use crate::{error::Error, params::Params, view::ConfigView};

/// A constructed object with its concrete `Arc<T>` erased.
pub(crate) type Erased = Box<dyn Any + Send + Sync>;

/// Signature of the factories stored in the global registry.
pub type FactoryFn = fn(ConfigView, &Params) -> Result<Box<dyn Any + Send + Sync>, Error>;

type DynFactory = dyn Fn(ConfigView, &Params) -> Result<Erased, Error> + Send + Sync;

/// Types that can build themselves from a configuration subtree.
///
/// `config` is the view over the entry that named the class, so the object
/// can keep reading its own nested settings later. `params` carries the
/// keyword parameters the caller passed to
/// [`create_instance`](crate::ConfigObject::create_instance).
///
/// Errors returned here reach the caller unchanged.
pub trait FromConfig: Sized + Send + Sync + 'static {
    fn from_config(config: ConfigView, params: &Params) -> Result<Self, Error>;
}

/// A [`FromConfig`] type bound to a class name, usually through `#[derive(Plugin)]`.
pub trait Plugin: FromConfig {
    const CLASS: &'static str;
}

/// A globally registered class.
pub struct RegisteredClass {
    pub name: &'static str,
    pub factory: FactoryFn,
}

impl RegisteredClass {
    pub const fn new<T: FromConfig>(name: &'static str) -> Self {
        Self {
            name,
            factory: build_erased::<T>,
        }
    }
}

inventory::collect!(RegisteredClass);

/// Registers a [`FromConfig`] type under a class name for every store.
///
/// ```rust,ignore
/// scoped_config::submit_class!("mymodule.PgStore", PgStore);
/// ```
#[macro_export]
macro_rules! submit_class {
    ($name:expr, $class_type:ty) => {
        $crate::inventory::submit! {
            $crate::RegisteredClass::new::<$class_type>($name)
        }
    };
}

fn build_erased<T: FromConfig>(config: ConfigView, params: &Params) -> Result<Erased, Error> {
    let instance: Arc<T> = Arc::new(T::from_config(config, params)?);
    Ok(Box::new(instance))
}

/// Classes registered on one store, consulted before the global registry.
#[derive(Clone, Default)]
pub struct Registry {
    classes: HashMap<String, Arc<DynFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name`, producing `Arc<T>`.
    pub fn register<T: FromConfig>(&mut self, name: impl Into<String>) {
        self.classes
            .insert(name.into(), Arc::new(build_erased::<T>));
    }

    /// Registers an arbitrary factory under `name`.
    ///
    /// The product type may be a trait object, which lets several classes
    /// stand behind one interface:
    ///
    /// ```rust,ignore
    /// registry.register_with("mymodule.PgStore", |config, params| {
    ///     Ok(Arc::new(PgStore::from_config(config, params)?) as Arc<dyn Store>)
    /// });
    /// ```
    pub fn register_with<T, F>(&mut self, name: impl Into<String>, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(ConfigView, &Params) -> Result<Arc<T>, Error> + Send + Sync + 'static,
    {
        let factory = move |config: ConfigView, params: &Params| -> Result<Erased, Error> {
            Ok(Box::new(factory(config, params)?))
        };
        self.classes.insert(name.into(), Arc::new(factory));
    }

    /// Returns `true` if `name` resolves either locally or globally.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    fn resolve(&self, name: &str) -> Option<&DynFactory> {
        if let Some(factory) = self.classes.get(name) {
            return Some(factory.as_ref());
        }

        inventory::iter::<RegisteredClass>
            .into_iter()
            .find(|registration| registration.name == name)
            .map(|registration| &registration.factory as &DynFactory)
    }

    /// Runs the factory registered under `class`.
    pub(crate) fn build(
        &self,
        class: &str,
        config: ConfigView,
        params: &Params,
    ) -> Result<Erased, Error> {
        let factory = self
            .resolve(class)
            .ok_or_else(|| Error::UnresolvedClass(class.to_string()))?;

        factory(config, params)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.classes.keys().collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("classes", &names).finish()
    }
}

/// Recovers the `Arc<T>` a factory produced.
pub(crate) fn downcast<T: ?Sized + 'static>(class: &str, erased: &Erased) -> Result<Arc<T>, Error> {
    erased
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| Error::InstanceType {
            class: class.to_string(),
            expected: std::any::type_name::<T>(),
        })
}
