use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Named keyword parameters handed to [`FromConfig::from_config`](crate::FromConfig::from_config).
///
/// Values are type-erased, so a caller can pass collaborators (a shared
/// container, a connection pool, a plain number) next to the configuration
/// view. Plugins read them back with [`Params::get`].
#[derive(Clone, Default)]
pub struct Params {
    inner: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Params {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Builder-style [`insert`](Params::insert).
    pub fn with<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.inner.insert(name.into(), Arc::new(value));
    }

    /// Returns the parameter called `name` if it exists and has type `T`.
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.inner.get(name).and_then(|v| v.downcast_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Params").field("names", &names).finish()
    }
}
