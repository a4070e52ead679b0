//! Named factory registry.
//!
//! Backends and components register a constructor under a unique name
//! while the registry is being built. After construction the registry is
//! only read, so a shared reference can be handed to any number of threads.

use std::collections::BTreeMap;
use std::fmt;

/// Registry of factories producing boxed `T` values by name.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    factories: BTreeMap<&'static str, fn() -> Box<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry. `kind` names the registered things in
    /// messages ("platform", "component").
    pub fn new(kind: &'static str) -> Self {
        Registry {
            kind,
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered. Registration only happens
    /// while the process starts, so a duplicate is a programming error.
    pub fn register(&mut self, name: &'static str, factory: fn() -> Box<T>) {
        if self.factories.insert(name, factory).is_some() {
            panic!("{} `{}` is already registered", self.kind, name);
        }
    }

    /// Construct a fresh instance of the entry registered as `name`.
    pub fn get(&self, name: &str) -> Option<Box<T>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
