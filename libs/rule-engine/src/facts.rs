//! Fact store
//!
//! Named, typed values read by conditions and read/written by actions.
//! The engine never owns the store: it is passed by reference into every
//! evaluation call and mutated by actions as a side effect.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, RuleError};

type FactValue = Box<dyn Any + Send + Sync>;

/// Mutable bag of named facts
#[derive(Default)]
pub struct Facts {
    facts: HashMap<String, FactValue>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Facts::put`]
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.put(name, value);
        self
    }

    /// Declare a fact, replacing any previous value under the same name
    pub fn put<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.facts.insert(name.into(), Box::new(value));
    }

    /// Remove a fact, returning whether it was declared
    pub fn remove(&mut self, name: &str) -> bool {
        self.facts.remove(name).is_some()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.facts.contains_key(name)
    }

    /// Borrow a fact value
    ///
    /// Fails with [`RuleError::UndeclaredFact`] when the name is unknown and
    /// [`RuleError::FactTypeMismatch`] when the value is not a `T`.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T> {
        let value = self
            .facts
            .get(name)
            .ok_or_else(|| RuleError::UndeclaredFact(name.to_string()))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| RuleError::FactTypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Mutably borrow a fact value
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Result<&mut T> {
        let value = self
            .facts
            .get_mut(name)
            .ok_or_else(|| RuleError::UndeclaredFact(name.to_string()))?;
        value
            .downcast_mut::<T>()
            .ok_or_else(|| RuleError::FactTypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Clone a fact value out of the store
    pub fn value<T: Any + Clone>(&self, name: &str) -> Result<T> {
        self.get::<T>(name).cloned()
    }

    /// Declared fact names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.facts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl fmt::Debug for Facts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Facts").field("declared", &names).finish()
    }
}
