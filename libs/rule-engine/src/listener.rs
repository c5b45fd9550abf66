//! Listener protocol
//!
//! Listeners observe every step of an evaluation pass and may end it early
//! through the two `should_stop_*` hooks. Every hook has a safe default:
//! notifications do nothing, stop hooks say "continue".
//!
//! ```text
//! should_stop_before ─► before_condition ─► accept ─► after_condition
//!                                             │ Err ─► on_condition_error
//!                         accepted ─► before_action ─► execute ─► after_action
//!                                                        │ Err ─► on_action_error
//! should_stop_after(outcome)
//! ```

use std::sync::Arc;

use crate::error::RuleError;
use crate::facts::Facts;
use crate::rule::{Rule, RuleKey};

/// What happened to one rule during a pass
///
/// Condition and action failures are kept apart so a stop policy can tell
/// "could not decide" from "decided but failed to act".
#[derive(Debug)]
pub enum RuleOutcome {
    /// Condition held and the action completed
    Applied,
    /// Condition did not hold
    Declined,
    /// Condition failed; the rule counts as not accepted
    ConditionFailed(RuleError),
    /// Condition held but the action failed
    ActionFailed(RuleError),
}

impl RuleOutcome {
    /// Whether the condition held
    pub fn accepted(&self) -> bool {
        matches!(self, RuleOutcome::Applied | RuleOutcome::ActionFailed(_))
    }

    pub fn error(&self) -> Option<&RuleError> {
        match self {
            RuleOutcome::ConditionFailed(err) | RuleOutcome::ActionFailed(err) => Some(err),
            RuleOutcome::Applied | RuleOutcome::Declined => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }
}

/// Observer of the evaluation lifecycle
#[allow(unused_variables)]
pub trait RuleListener: Send + Sync {
    /// Return `true` to end the pass before `rule` is evaluated
    fn should_stop_before(&self, rule: &dyn Rule, facts: &Facts) -> bool {
        false
    }

    fn before_condition(&self, rule: &dyn Rule, facts: &Facts) {}

    fn after_condition(&self, rule: &dyn Rule, facts: &Facts, accepted: bool) {}

    fn on_condition_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {}

    fn before_action(&self, rule: &dyn Rule, facts: &Facts) {}

    fn after_action(&self, rule: &dyn Rule, facts: &Facts) {}

    fn on_action_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {}

    /// Return `true` to end the pass after `rule` was evaluated
    fn should_stop_after(&self, rule: &dyn Rule, facts: &Facts, outcome: &RuleOutcome) -> bool {
        false
    }
}

/// Listener that only uses the defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpListener;

impl RuleListener for NoOpListener {}

impl<L: RuleListener + ?Sized> RuleListener for Arc<L> {
    fn should_stop_before(&self, rule: &dyn Rule, facts: &Facts) -> bool {
        (**self).should_stop_before(rule, facts)
    }

    fn before_condition(&self, rule: &dyn Rule, facts: &Facts) {
        (**self).before_condition(rule, facts)
    }

    fn after_condition(&self, rule: &dyn Rule, facts: &Facts, accepted: bool) {
        (**self).after_condition(rule, facts, accepted)
    }

    fn on_condition_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        (**self).on_condition_error(rule, facts, error)
    }

    fn before_action(&self, rule: &dyn Rule, facts: &Facts) {
        (**self).before_action(rule, facts)
    }

    fn after_action(&self, rule: &dyn Rule, facts: &Facts) {
        (**self).after_action(rule, facts)
    }

    fn on_action_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        (**self).on_action_error(rule, facts, error)
    }

    fn should_stop_after(&self, rule: &dyn Rule, facts: &Facts, outcome: &RuleOutcome) -> bool {
        (**self).should_stop_after(rule, facts, outcome)
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Fan-out over several listeners
///
/// Notifications reach every listener in insertion order. A stop hook
/// returns `true` only when all listeners ask to stop. An empty composite
/// never stops, unlike a vacuous "all of none agree" reading that would
/// stop before every rule.
#[derive(Default)]
pub struct CompositeListener {
    listeners: Vec<Box<dyn RuleListener>>,
}

impl CompositeListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<L: RuleListener + 'static>(mut self, listener: L) -> Self {
        self.push(listener);
        self
    }

    pub fn push<L: RuleListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn consensus(&self, vote: impl Fn(&dyn RuleListener) -> bool) -> bool {
        !self.listeners.is_empty() && self.listeners.iter().all(|l| vote(l.as_ref()))
    }
}

impl RuleListener for CompositeListener {
    fn should_stop_before(&self, rule: &dyn Rule, facts: &Facts) -> bool {
        self.consensus(|l| l.should_stop_before(rule, facts))
    }

    fn before_condition(&self, rule: &dyn Rule, facts: &Facts) {
        self.listeners
            .iter()
            .for_each(|l| l.before_condition(rule, facts));
    }

    fn after_condition(&self, rule: &dyn Rule, facts: &Facts, accepted: bool) {
        self.listeners
            .iter()
            .for_each(|l| l.after_condition(rule, facts, accepted));
    }

    fn on_condition_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        self.listeners
            .iter()
            .for_each(|l| l.on_condition_error(rule, facts, error));
    }

    fn before_action(&self, rule: &dyn Rule, facts: &Facts) {
        self.listeners
            .iter()
            .for_each(|l| l.before_action(rule, facts));
    }

    fn after_action(&self, rule: &dyn Rule, facts: &Facts) {
        self.listeners
            .iter()
            .for_each(|l| l.after_action(rule, facts));
    }

    fn on_action_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        self.listeners
            .iter()
            .for_each(|l| l.on_action_error(rule, facts, error));
    }

    fn should_stop_after(&self, rule: &dyn Rule, facts: &Facts, outcome: &RuleOutcome) -> bool {
        self.consensus(|l| l.should_stop_after(rule, facts, outcome))
    }
}

/// Forwards hooks to `listener` only for rules equal to the target
pub struct RuleScopedListener {
    target: RuleKey,
    listener: Box<dyn RuleListener>,
}

impl RuleScopedListener {
    pub fn new<L: RuleListener + 'static>(target: &dyn Rule, listener: L) -> Self {
        Self::for_key(target.key(), listener)
    }

    pub fn for_key<L: RuleListener + 'static>(target: RuleKey, listener: L) -> Self {
        Self {
            target,
            listener: Box::new(listener),
        }
    }

    fn applies(&self, rule: &dyn Rule) -> bool {
        self.target.matches(rule)
    }
}

impl RuleListener for RuleScopedListener {
    fn should_stop_before(&self, rule: &dyn Rule, facts: &Facts) -> bool {
        self.applies(rule) && self.listener.should_stop_before(rule, facts)
    }

    fn before_condition(&self, rule: &dyn Rule, facts: &Facts) {
        if self.applies(rule) {
            self.listener.before_condition(rule, facts);
        }
    }

    fn after_condition(&self, rule: &dyn Rule, facts: &Facts, accepted: bool) {
        if self.applies(rule) {
            self.listener.after_condition(rule, facts, accepted);
        }
    }

    fn on_condition_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        if self.applies(rule) {
            self.listener.on_condition_error(rule, facts, error);
        }
    }

    fn before_action(&self, rule: &dyn Rule, facts: &Facts) {
        if self.applies(rule) {
            self.listener.before_action(rule, facts);
        }
    }

    fn after_action(&self, rule: &dyn Rule, facts: &Facts) {
        if self.applies(rule) {
            self.listener.after_action(rule, facts);
        }
    }

    fn on_action_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        if self.applies(rule) {
            self.listener.on_action_error(rule, facts, error);
        }
    }

    fn should_stop_after(&self, rule: &dyn Rule, facts: &Facts, outcome: &RuleOutcome) -> bool {
        self.applies(rule) && self.listener.should_stop_after(rule, facts, outcome)
    }
}

// ============================================================================
// Built-in policies
// ============================================================================

/// Stops before the first rule whose priority exceeds the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityThresholdListener {
    threshold: i32,
}

impl PriorityThresholdListener {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }
}

impl RuleListener for PriorityThresholdListener {
    fn should_stop_before(&self, rule: &dyn Rule, _facts: &Facts) -> bool {
        if rule.priority() > self.threshold {
            tracing::debug!(
                "Rule {} exceeds priority threshold {}, remaining rules skipped",
                rule.key(),
                self.threshold
            );
            return true;
        }
        false
    }
}

/// Stops after any rule whose condition or action failed
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipAfterFailedRuleListener;

impl RuleListener for SkipAfterFailedRuleListener {
    fn should_stop_after(&self, rule: &dyn Rule, _facts: &Facts, outcome: &RuleOutcome) -> bool {
        if let Some(err) = outcome.error() {
            tracing::debug!("Rule {} failed ({}), remaining rules skipped", rule.key(), err);
            return true;
        }
        false
    }
}

/// Stops after any rule whose condition did not hold
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipAfterDeclinedRuleListener;

impl RuleListener for SkipAfterDeclinedRuleListener {
    fn should_stop_after(&self, rule: &dyn Rule, _facts: &Facts, outcome: &RuleOutcome) -> bool {
        if !outcome.accepted() {
            tracing::debug!(
                "Rule {} was not accepted, remaining rules skipped",
                rule.key()
            );
            return true;
        }
        false
    }
}

/// A caller's listener plus stop policies
///
/// Notifications go to the inner listener only. The pass stops as soon as
/// the inner listener or any single policy asks to stop.
pub struct PolicyListener {
    inner: Box<dyn RuleListener>,
    policies: Vec<Box<dyn RuleListener>>,
}

impl PolicyListener {
    pub fn new<L: RuleListener + 'static>(inner: L) -> Self {
        Self::from_boxed(Box::new(inner))
    }

    pub fn from_boxed(inner: Box<dyn RuleListener>) -> Self {
        Self {
            inner,
            policies: Vec::new(),
        }
    }

    pub fn with_policy<P: RuleListener + 'static>(mut self, policy: P) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }
}

impl RuleListener for PolicyListener {
    fn should_stop_before(&self, rule: &dyn Rule, facts: &Facts) -> bool {
        self.inner.should_stop_before(rule, facts)
            || self
                .policies
                .iter()
                .any(|p| p.should_stop_before(rule, facts))
    }

    fn before_condition(&self, rule: &dyn Rule, facts: &Facts) {
        self.inner.before_condition(rule, facts);
    }

    fn after_condition(&self, rule: &dyn Rule, facts: &Facts, accepted: bool) {
        self.inner.after_condition(rule, facts, accepted);
    }

    fn on_condition_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        self.inner.on_condition_error(rule, facts, error);
    }

    fn before_action(&self, rule: &dyn Rule, facts: &Facts) {
        self.inner.before_action(rule, facts);
    }

    fn after_action(&self, rule: &dyn Rule, facts: &Facts) {
        self.inner.after_action(rule, facts);
    }

    fn on_action_error(&self, rule: &dyn Rule, facts: &Facts, error: &RuleError) {
        self.inner.on_action_error(rule, facts, error);
    }

    fn should_stop_after(&self, rule: &dyn Rule, facts: &Facts, outcome: &RuleOutcome) -> bool {
        self.inner.should_stop_after(rule, facts, outcome)
            || self
                .policies
                .iter()
                .any(|p| p.should_stop_after(rule, facts, outcome))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::builder::RuleBuilder;
    use parking_lot::Mutex;

    fn rule(name: &str, priority: i32) -> Arc<dyn Rule> {
        Arc::new(RuleBuilder::new(name).priority(priority).build().unwrap())
    }

    /// Records hook names and answers stop hooks with a fixed vote
    struct Recorder {
        tag: &'static str,
        stop: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(tag: &'static str, stop: bool, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                tag,
                stop,
                log: Arc::clone(log),
            }
        }

        fn record(&self, hook: &str, rule: &dyn Rule) {
            self.log
                .lock()
                .push(format!("{}:{}:{}", self.tag, hook, rule.name()));
        }
    }

    impl RuleListener for Recorder {
        fn should_stop_before(&self, rule: &dyn Rule, _facts: &Facts) -> bool {
            self.record("stop_before", rule);
            self.stop
        }

        fn before_condition(&self, rule: &dyn Rule, _facts: &Facts) {
            self.record("before_condition", rule);
        }

        fn on_action_error(&self, rule: &dyn Rule, _facts: &Facts, _error: &RuleError) {
            self.record("action_error", rule);
        }

        fn should_stop_after(&self, rule: &dyn Rule, _facts: &Facts, _outcome: &RuleOutcome) -> bool {
            self.record("stop_after", rule);
            self.stop
        }
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(RuleOutcome::Applied.accepted());
        assert!(!RuleOutcome::Declined.accepted());
        assert!(!RuleOutcome::ConditionFailed(RuleError::condition("x")).accepted());
        assert!(RuleOutcome::ActionFailed(RuleError::action("x")).accepted());

        assert!(!RuleOutcome::Applied.is_failure());
        assert!(RuleOutcome::ConditionFailed(RuleError::condition("x")).is_failure());
        assert!(matches!(
            RuleOutcome::ActionFailed(RuleError::action("x")).error(),
            Some(RuleError::ActionError(_))
        ));
    }

    #[test]
    fn test_noop_defaults() {
        let r = rule("r", 1);
        let facts = Facts::new();

        assert!(!NoOpListener.should_stop_before(r.as_ref(), &facts));
        assert!(!NoOpListener.should_stop_after(r.as_ref(), &facts, &RuleOutcome::Declined));
    }

    #[test]
    fn test_composite_notifies_all_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let composite = CompositeListener::new()
            .with(Recorder::new("one", false, &log))
            .with(Recorder::new("two", false, &log));
        let r = rule("r", 1);

        composite.before_condition(r.as_ref(), &Facts::new());
        composite.on_action_error(r.as_ref(), &Facts::new(), &RuleError::action("x"));

        assert_eq!(
            *log.lock(),
            vec![
                "one:before_condition:r",
                "two:before_condition:r",
                "one:action_error:r",
                "two:action_error:r",
            ]
        );
    }

    #[test]
    fn test_composite_stops_only_on_consensus() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let r = rule("r", 1);
        let facts = Facts::new();

        let split = CompositeListener::new()
            .with(Recorder::new("yes", true, &log))
            .with(Recorder::new("no", false, &log));
        assert!(!split.should_stop_before(r.as_ref(), &facts));
        assert!(!split.should_stop_after(r.as_ref(), &facts, &RuleOutcome::Applied));

        let agreed = CompositeListener::new()
            .with(Recorder::new("a", true, &log))
            .with(Recorder::new("b", true, &log));
        assert!(agreed.should_stop_before(r.as_ref(), &facts));
        assert!(agreed.should_stop_after(r.as_ref(), &facts, &RuleOutcome::Applied));
    }

    #[test]
    fn test_empty_composite_never_stops() {
        let composite = CompositeListener::new();
        let r = rule("r", 1);

        assert!(composite.is_empty());
        assert!(!composite.should_stop_before(r.as_ref(), &Facts::new()));
        assert!(!composite.should_stop_after(r.as_ref(), &Facts::new(), &RuleOutcome::Declined));
    }

    #[test]
    fn test_scoped_listener_filters_by_rule_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = rule("target", 1);
        let other = rule("other", 1);
        let same_name_other_priority = rule("target", 2);
        let scoped = RuleScopedListener::new(target.as_ref(), Recorder::new("s", true, &log));
        let facts = Facts::new();

        assert!(!scoped.should_stop_before(other.as_ref(), &facts));
        assert!(!scoped.should_stop_before(same_name_other_priority.as_ref(), &facts));
        scoped.before_condition(other.as_ref(), &facts);
        assert!(log.lock().is_empty());

        // An equal rule built separately still matches
        let twin = rule("target", 1);
        assert!(scoped.should_stop_before(twin.as_ref(), &facts));
        scoped.before_condition(twin.as_ref(), &facts);
        assert_eq!(
            *log.lock(),
            vec!["s:stop_before:target", "s:before_condition:target"]
        );
    }

    #[test]
    fn test_priority_threshold() {
        let listener = PriorityThresholdListener::new(2);
        let facts = Facts::new();

        assert!(!listener.should_stop_before(rule("low", 1).as_ref(), &facts));
        assert!(!listener.should_stop_before(rule("same", 2).as_ref(), &facts));
        assert!(listener.should_stop_before(rule("high", 3).as_ref(), &facts));
    }

    #[test]
    fn test_skip_after_failed() {
        let listener = SkipAfterFailedRuleListener;
        let r = rule("r", 1);
        let facts = Facts::new();

        assert!(listener.should_stop_after(
            r.as_ref(),
            &facts,
            &RuleOutcome::ActionFailed(RuleError::action("x"))
        ));
        assert!(listener.should_stop_after(
            r.as_ref(),
            &facts,
            &RuleOutcome::ConditionFailed(RuleError::condition("x"))
        ));
        assert!(!listener.should_stop_after(r.as_ref(), &facts, &RuleOutcome::Applied));
        assert!(!listener.should_stop_after(r.as_ref(), &facts, &RuleOutcome::Declined));
    }

    #[test]
    fn test_skip_after_declined() {
        let listener = SkipAfterDeclinedRuleListener;
        let r = rule("r", 1);
        let facts = Facts::new();

        assert!(listener.should_stop_after(r.as_ref(), &facts, &RuleOutcome::Declined));
        assert!(listener.should_stop_after(
            r.as_ref(),
            &facts,
            &RuleOutcome::ConditionFailed(RuleError::condition("x"))
        ));
        assert!(!listener.should_stop_after(r.as_ref(), &facts, &RuleOutcome::Applied));
    }

    #[test]
    fn test_policy_listener_stops_on_any_vote() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = PolicyListener::new(Recorder::new("inner", false, &log))
            .with_policy(PriorityThresholdListener::new(5))
            .with_policy(SkipAfterDeclinedRuleListener);
        let facts = Facts::new();

        assert_eq!(listener.policy_count(), 2);
        assert!(!listener.should_stop_before(rule("ok", 5).as_ref(), &facts));
        assert!(listener.should_stop_before(rule("late", 6).as_ref(), &facts));
        assert!(listener.should_stop_after(rule("ok", 5).as_ref(), &facts, &RuleOutcome::Declined));
        assert!(!listener.should_stop_after(rule("ok", 5).as_ref(), &facts, &RuleOutcome::Applied));
    }

    #[test]
    fn test_policy_listener_forwards_notifications_to_inner() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = PolicyListener::new(Recorder::new("inner", false, &log))
            .with_policy(SkipAfterFailedRuleListener);

        listener.before_condition(rule("r", 1).as_ref(), &Facts::new());

        assert_eq!(*log.lock(), vec!["inner:before_condition:r"]);
    }
}
