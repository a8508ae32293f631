//! The key/value store bound to one logical unit of work.

use super::ContextValue;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A key/value store owned by one logical scope.
///
/// A child scope is created with [`Scope::branch`], which copies the parent's
/// current values. Writes never travel between parent, child or siblings.
#[derive(Debug, Default)]
pub struct Scope {
    values: RwLock<HashMap<String, ContextValue>>,
}

impl Scope {
    /// Creates a new empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope seeded with existing values.
    #[must_use]
    pub fn from_values(values: HashMap<String, ContextValue>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Creates a child scope from a snapshot of this scope.
    #[must_use]
    pub fn branch(&self) -> Self {
        Self::from_values(self.snapshot())
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ContextValue> {
        self.values.read().get(key).cloned()
    }

    /// Sets a value, overwriting any previous one.
    pub fn set(&self, key: impl Into<String>, value: ContextValue) {
        self.values.write().insert(key.into(), value);
    }

    /// Sets a value only if the key is absent. Returns the stored value.
    pub fn get_or_insert_with(
        &self,
        key: &str,
        make: impl FnOnce() -> ContextValue,
    ) -> ContextValue {
        self.values
            .write()
            .entry(key.to_string())
            .or_insert_with(make)
            .clone()
    }

    /// Returns a shallow copy of all values.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, ContextValue> {
        self.values.read().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if the scope holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
