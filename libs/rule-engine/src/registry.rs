//! Rule registry - ordered, duplicate-free rule collection

use std::collections::btree_set::{self, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::rule::Rule;

/// Rules sorted by priority then name, unique by (priority, name)
///
/// Registering a rule equal to one already present keeps the existing rule.
/// Not safe for concurrent `register` while iterating; share a snapshot
/// (the registry is cheap to clone) instead.
#[derive(Clone, Default)]
pub struct Rules {
    rules: BTreeSet<Arc<dyn Rule>>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, returning `false` if an equal rule was already present
    pub fn register<R: Rule + 'static>(&mut self, rule: R) -> bool {
        self.register_shared(Arc::new(rule))
    }

    pub fn register_shared(&mut self, rule: Arc<dyn Rule>) -> bool {
        self.rules.insert(rule)
    }

    /// Remove the rule equal to `rule`, returning whether one was present
    pub fn unregister(&mut self, rule: &dyn Rule) -> bool {
        let found = self.rules.iter().find(|r| ***r == *rule).cloned();
        match found {
            Some(existing) => self.rules.remove(&existing),
            None => false,
        }
    }

    pub fn contains(&self, rule: &dyn Rule) -> bool {
        self.rules.iter().any(|r| **r == *rule)
    }

    /// Iterate in ascending rule order
    pub fn iter(&self) -> btree_set::Iter<'_, Arc<dyn Rule>> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Arc<dyn Rule>> for Rules {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Rule>>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl Extend<Arc<dyn Rule>> for Rules {
    fn extend<I: IntoIterator<Item = Arc<dyn Rule>>>(&mut self, iter: I) {
        for rule in iter {
            self.register_shared(rule);
        }
    }
}

impl<'a> IntoIterator for &'a Rules {
    type Item = &'a Arc<dyn Rule>;
    type IntoIter = btree_set::Iter<'a, Arc<dyn Rule>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rules.iter()).finish()
    }
}
