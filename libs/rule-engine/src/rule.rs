//! Rule contract
//!
//! Core types:
//! - Condition / Action: the two halves of a rule, usually closures
//! - Rule: name, description, priority plus condition and action, totally ordered
//! - RuleKey: owned snapshot of a rule's identity (priority, name)
//! - EvaluationContext: per-evaluation state threaded through accept/execute
//! - DefaultRule: the rule produced by `RuleBuilder`

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::facts::Facts;

/// Lowest urgency priority, used when a rule does not declare one
pub const DEFAULT_PRIORITY: i32 = i32::MAX - 1;

// ============================================================================
// Condition / Action
// ============================================================================

/// Predicate over the fact store
pub trait Condition: Send + Sync {
    fn accept(&self, facts: &Facts) -> Result<bool>;
}

impl<F> Condition for F
where
    F: Fn(&Facts) -> Result<bool> + Send + Sync,
{
    fn accept(&self, facts: &Facts) -> Result<bool> {
        self(facts)
    }
}

/// Effectful procedure over the fact store
pub trait Action: Send + Sync {
    fn execute(&self, facts: &mut Facts) -> Result<()>;
}

impl<F> Action for F
where
    F: Fn(&mut Facts) -> Result<()> + Send + Sync,
{
    fn execute(&self, facts: &mut Facts) -> Result<()> {
        self(facts)
    }
}

// ============================================================================
// Rule
// ============================================================================

/// Unit of evaluation
///
/// Rules are ordered by priority ascending, then by name. Two rules with the
/// same priority and name are equal regardless of what they do; registries
/// rely on this to de-duplicate. Name and priority must not change once a
/// rule has been registered.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Lower value = evaluated earlier
    fn priority(&self) -> i32;

    /// Evaluate the rule condition against the facts
    fn accept(&self, facts: &Facts, ctx: &mut EvaluationContext) -> Result<bool>;

    /// Run the rule action
    fn execute(&self, facts: &mut Facts, ctx: &mut EvaluationContext) -> Result<()>;

    fn key(&self) -> RuleKey {
        RuleKey::new(self.priority(), self.name())
    }
}

impl<'a> PartialEq for dyn Rule + 'a {
    fn eq(&self, other: &Self) -> bool {
        self.priority() == other.priority() && self.name() == other.name()
    }
}

impl<'a> Eq for dyn Rule + 'a {}

impl<'a> PartialOrd for dyn Rule + 'a {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for dyn Rule + 'a {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority()
            .cmp(&other.priority())
            .then_with(|| self.name().cmp(other.name()))
    }
}

impl<'a> fmt::Debug for dyn Rule + 'a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name())
            .field("priority", &self.priority())
            .finish()
    }
}

/// Owned rule identity, usable as a map key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleKey {
    pub priority: i32,
    pub name: String,
}

impl RuleKey {
    pub fn new(priority: i32, name: impl Into<String>) -> Self {
        Self {
            priority,
            name: name.into(),
        }
    }

    /// Whether `rule` has this identity
    pub fn matches(&self, rule: &dyn Rule) -> bool {
        self.priority == rule.priority() && self.name == rule.name()
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.priority)
    }
}

// ============================================================================
// Evaluation Context
// ============================================================================

/// State scoped to one logical evaluation
///
/// Composite rules that need to carry a decision from `accept` to `execute`
/// (the ANY combinator) store it here instead of in shared state, so two
/// evaluations running side by side never see each other's matches.
#[derive(Default)]
pub struct EvaluationContext {
    matches: HashMap<RuleKey, Arc<dyn Rule>>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the sub-rule matched by the composite identified by `composite`
    pub fn remember_match(&mut self, composite: RuleKey, matched: Arc<dyn Rule>) {
        self.matches.insert(composite, matched);
    }

    /// Remove and return the sub-rule last matched by `composite`
    pub fn take_match(&mut self, composite: &RuleKey) -> Option<Arc<dyn Rule>> {
        self.matches.remove(composite)
    }

    pub fn has_match(&self, composite: &RuleKey) -> bool {
        self.matches.contains_key(composite)
    }

    pub fn clear(&mut self) {
        self.matches.clear();
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.matches.iter().map(|(k, v)| (k, v.name())))
            .finish()
    }
}

// ============================================================================
// Default Rule
// ============================================================================

/// Rule built from a condition and an ordered list of actions
pub struct DefaultRule {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) priority: i32,
    pub(crate) condition: Box<dyn Condition>,
    pub(crate) actions: Vec<Box<dyn Action>>,
}

impl Rule for DefaultRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn accept(&self, facts: &Facts, _ctx: &mut EvaluationContext) -> Result<bool> {
        self.condition.accept(facts)
    }

    fn execute(&self, facts: &mut Facts, _ctx: &mut EvaluationContext) -> Result<()> {
        for action in &self.actions {
            action.execute(facts)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DefaultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRule")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("priority", &self.priority)
            .field("actions", &self.actions.len())
            .finish()
    }
}
