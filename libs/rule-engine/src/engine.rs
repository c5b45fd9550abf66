//! Rule engines and their builder
//!
//! The default engine makes a single ordered pass over its registry; the
//! inference engine (see [`crate::inference`]) repeats such passes until no
//! rule applies.

use std::fmt;
use std::sync::Arc;

use crate::config::{EngineConfig, EngineMode};
use crate::declared::{DeclarativeRule, DeclaredRule};
use crate::error::Result;
use crate::facts::Facts;
use crate::inference::InferenceRuleEngine;
use crate::listener::{
    NoOpListener, PolicyListener, PriorityThresholdListener, RuleListener, RuleOutcome,
    SkipAfterDeclinedRuleListener, SkipAfterFailedRuleListener,
};
use crate::registry::Rules;
use crate::rule::{EvaluationContext, Rule};

/// Evaluates a rule set against a fact store
///
/// Evaluation never fails: condition and action failures are reported
/// through the engine's listener and logged.
pub trait RuleEngine: Send + Sync {
    fn rules(&self) -> &Rules;

    fn evaluate(&self, facts: &mut Facts);
}

// ============================================================================
// Default Engine
// ============================================================================

/// Single pass over the rules in ascending order
pub struct DefaultRuleEngine {
    listener: Box<dyn RuleListener>,
    rules: Rules,
}

impl DefaultRuleEngine {
    pub fn new<L: RuleListener + 'static>(listener: L, rules: Rules) -> Self {
        Self::from_boxed(Box::new(listener), rules)
    }

    pub fn from_boxed(listener: Box<dyn RuleListener>, rules: Rules) -> Self {
        Self { listener, rules }
    }

    /// Run one pass with a caller-owned evaluation context
    pub fn evaluate_with(&self, facts: &mut Facts, ctx: &mut EvaluationContext) {
        run_pass(&self.rules, self.listener.as_ref(), facts, ctx);
    }
}

impl RuleEngine for DefaultRuleEngine {
    fn rules(&self) -> &Rules {
        &self.rules
    }

    fn evaluate(&self, facts: &mut Facts) {
        let mut ctx = EvaluationContext::new();
        self.evaluate_with(facts, &mut ctx);
    }
}

impl fmt::Debug for DefaultRuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRuleEngine")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// One ordered pass; shared by both engines
pub(crate) fn run_pass(
    rules: &Rules,
    listener: &dyn RuleListener,
    facts: &mut Facts,
    ctx: &mut EvaluationContext,
) {
    tracing::debug!("Rule engine evaluating: {:?}", facts);

    for rule in rules {
        let rule: &dyn Rule = rule.as_ref();

        if listener.should_stop_before(rule, facts) {
            tracing::debug!("Stopping evaluation before rule {}", rule.key());
            break;
        }

        let outcome = evaluate_rule(rule, listener, facts, ctx);

        if listener.should_stop_after(rule, facts, &outcome) {
            tracing::debug!("Stopping evaluation after rule {}", rule.key());
            break;
        }
    }
}

fn evaluate_rule(
    rule: &dyn Rule,
    listener: &dyn RuleListener,
    facts: &mut Facts,
    ctx: &mut EvaluationContext,
) -> RuleOutcome {
    listener.before_condition(rule, facts);
    let accepted = match rule.accept(facts, ctx) {
        Ok(accepted) => accepted,
        Err(err) => {
            tracing::error!("Rule {} failed condition check: {}", rule.key(), err);
            listener.on_condition_error(rule, facts, &err);
            return RuleOutcome::ConditionFailed(err);
        },
    };
    listener.after_condition(rule, facts, accepted);

    if !accepted {
        tracing::debug!("Rule {} was not accepted", rule.key());
        return RuleOutcome::Declined;
    }

    tracing::debug!("Executing rule {}", rule.key());
    listener.before_action(rule, facts);
    match rule.execute(facts, ctx) {
        Ok(()) => {
            listener.after_action(rule, facts);
            RuleOutcome::Applied
        },
        Err(err) => {
            tracing::error!("Rule {} failed execution: {}", rule.key(), err);
            listener.on_action_error(rule, facts, &err);
            RuleOutcome::ActionFailed(err)
        },
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles an engine from rules, a listener and configured stop policies
///
/// ```rust
/// use rule_engine::{Facts, RuleBuilder, RuleEngine, RuleEngineBuilder};
///
/// let engine = RuleEngineBuilder::new()
///     .rule(
///         RuleBuilder::new("greet")
///             .then(|facts: &mut Facts| {
///                 facts.put("greeted", true);
///                 Ok(())
///             })
///             .build()
///             .unwrap(),
///     )
///     .build_default();
///
/// let mut facts = Facts::new();
/// engine.evaluate(&mut facts);
/// assert!(facts.value::<bool>("greeted").unwrap());
/// ```
pub struct RuleEngineBuilder {
    mode: EngineMode,
    listener: Option<Box<dyn RuleListener>>,
    priority_threshold: Option<i32>,
    skip_after_failed: bool,
    skip_after_declined: bool,
    rules: Rules,
}

impl Default for RuleEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngineBuilder {
    pub fn new() -> Self {
        Self {
            mode: EngineMode::Default,
            listener: None,
            priority_threshold: None,
            skip_after_failed: false,
            skip_after_declined: false,
            rules: Rules::new(),
        }
    }

    /// Start from the engine mode and stop policies of a loaded configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            mode: config.mode,
            priority_threshold: config.priority_threshold,
            skip_after_failed: config.skip_after_failed,
            skip_after_declined: config.skip_after_declined,
            ..Self::new()
        }
    }

    pub fn mode(mut self, mode: EngineMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the caller's listener, replacing any previous one
    pub fn listener<L: RuleListener + 'static>(mut self, listener: L) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn priority_threshold(mut self, threshold: i32) -> Self {
        self.priority_threshold = Some(threshold);
        self
    }

    pub fn skip_after_failed(mut self, enabled: bool) -> Self {
        self.skip_after_failed = enabled;
        self
    }

    pub fn skip_after_declined(mut self, enabled: bool) -> Self {
        self.skip_after_declined = enabled;
        self
    }

    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.register(rule);
        self
    }

    pub fn rule_shared(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.register_shared(rule);
        self
    }

    /// Adapt a `#[rule]` host and register it
    pub fn declared_rule<H>(mut self, host: H) -> Result<Self>
    where
        H: DeclaredRule + Send + Sync + 'static,
    {
        self.rules.register(DeclarativeRule::new(host)?);
        Ok(self)
    }

    pub fn rules(mut self, rules: Rules) -> Self {
        self.rules.extend(rules.iter().cloned());
        self
    }

    pub fn build_default(self) -> DefaultRuleEngine {
        let (listener, rules) = self.into_parts();
        DefaultRuleEngine::from_boxed(listener, rules)
    }

    pub fn build_inference(self) -> InferenceRuleEngine {
        let (listener, rules) = self.into_parts();
        InferenceRuleEngine::from_boxed(listener, rules)
    }

    /// Build the engine selected by the configured mode
    pub fn build(self) -> Box<dyn RuleEngine> {
        match self.mode {
            EngineMode::Default => Box::new(self.build_default()),
            EngineMode::Inference => Box::new(self.build_inference()),
        }
    }

    fn into_parts(self) -> (Box<dyn RuleListener>, Rules) {
        let listener = self
            .listener
            .unwrap_or_else(|| Box::new(NoOpListener));

        if self.priority_threshold.is_none() && !self.skip_after_failed && !self.skip_after_declined
        {
            return (listener, self.rules);
        }

        let mut policy = PolicyListener::from_boxed(listener);
        if let Some(threshold) = self.priority_threshold {
            policy = policy.with_policy(PriorityThresholdListener::new(threshold));
        }
        if self.skip_after_failed {
            policy = policy.with_policy(SkipAfterFailedRuleListener);
        }
        if self.skip_after_declined {
            policy = policy.with_policy(SkipAfterDeclinedRuleListener);
        }
        tracing::debug!("Engine stop policies enabled: {}", policy.policy_count());
        (Box::new(policy), self.rules)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::builder::RuleBuilder;
    use crate::error::RuleError;
    use tracing_test::traced_test;

    fn counting_rule(name: &'static str, priority: i32) -> crate::rule::DefaultRule {
        RuleBuilder::new(name)
            .priority(priority)
            .then(move |facts: &mut Facts| {
                facts.get_mut::<Vec<&'static str>>("fired")?.push(name);
                Ok(())
            })
            .build()
            .unwrap()
    }

    fn fired(facts: &Facts) -> Vec<&'static str> {
        facts.value("fired").unwrap()
    }

    fn fired_facts() -> Facts {
        Facts::new().with("fired", Vec::<&'static str>::new())
    }

    #[test]
    fn test_rules_fire_in_priority_order() {
        let engine = RuleEngineBuilder::new()
            .rule(counting_rule("late", 10))
            .rule(counting_rule("early", 1))
            .build_default();
        let mut facts = fired_facts();

        engine.evaluate(&mut facts);

        assert_eq!(fired(&facts), vec!["early", "late"]);
        assert_eq!(engine.rules().len(), 2);
    }

    #[test]
    fn test_condition_error_is_swallowed() {
        let engine = RuleEngineBuilder::new()
            .rule(
                RuleBuilder::new("broken")
                    .priority(1)
                    .when(|_: &Facts| Err(RuleError::condition("boom")))
                    .then(|_: &mut Facts| Err(RuleError::action("must not run")))
                    .build()
                    .unwrap(),
            )
            .rule(counting_rule("next", 2))
            .build_default();
        let mut facts = fired_facts();

        engine.evaluate(&mut facts);

        assert_eq!(fired(&facts), vec!["next"]);
    }

    #[test]
    fn test_action_error_does_not_abort_pass() {
        let engine = RuleEngineBuilder::new()
            .rule(
                RuleBuilder::new("failing")
                    .priority(1)
                    .then(|_: &mut Facts| Err(RuleError::action("boom")))
                    .build()
                    .unwrap(),
            )
            .rule(counting_rule("next", 2))
            .build_default();
        let mut facts = fired_facts();

        engine.evaluate(&mut facts);

        assert_eq!(fired(&facts), vec!["next"]);
    }

    #[test]
    #[traced_test]
    fn test_failures_are_logged() {
        let engine = RuleEngineBuilder::new()
            .rule(
                RuleBuilder::new("bad condition")
                    .priority(1)
                    .when(|_: &Facts| Err(RuleError::condition("no sensor")))
                    .build()
                    .unwrap(),
            )
            .rule(
                RuleBuilder::new("bad action")
                    .priority(2)
                    .then(|_: &mut Facts| Err(RuleError::action("valve stuck")))
                    .build()
                    .unwrap(),
            )
            .build_default();

        engine.evaluate(&mut Facts::new());

        assert!(logs_contain("bad condition(1) failed condition check"));
        assert!(logs_contain("no sensor"));
        assert!(logs_contain("bad action(2) failed execution"));
        assert!(logs_contain("valve stuck"));
    }

    #[test]
    fn test_skip_after_failed_policy() {
        let engine = RuleEngineBuilder::new()
            .skip_after_failed(true)
            .rule(
                RuleBuilder::new("failing")
                    .priority(1)
                    .then(|_: &mut Facts| Err(RuleError::action("boom")))
                    .build()
                    .unwrap(),
            )
            .rule(counting_rule("next", 2))
            .build_default();
        let mut facts = fired_facts();

        engine.evaluate(&mut facts);

        assert!(fired(&facts).is_empty());
    }

    #[test]
    fn test_priority_threshold_policy() {
        let engine = RuleEngineBuilder::new()
            .priority_threshold(5)
            .rule(counting_rule("a", 1))
            .rule(counting_rule("b", 5))
            .rule(counting_rule("c", 6))
            .build_default();
        let mut facts = fired_facts();

        engine.evaluate(&mut facts);

        assert_eq!(fired(&facts), vec!["a", "b"]);
    }

    #[test]
    fn test_build_honours_config_mode() {
        let config = EngineConfig {
            mode: EngineMode::Inference,
            ..EngineConfig::default()
        };
        let engine = RuleEngineBuilder::from_config(&config)
            .rule(
                RuleBuilder::new("count to three")
                    .when_fact("n", |n: &u32| *n < 3)
                    .then(|facts: &mut Facts| {
                        *facts.get_mut::<u32>("n")? += 1;
                        Ok(())
                    })
                    .build()
                    .unwrap(),
            )
            .build();
        let mut facts = Facts::new().with("n", 0_u32);

        engine.evaluate(&mut facts);

        assert_eq!(facts.value::<u32>("n").unwrap(), 3);
    }
}
