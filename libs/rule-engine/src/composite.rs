//! Composite Rules - ALL / ANY combinators over a nested registry
//!
//! A composite has its own name and priority; the sub-rules' identities only
//! decide the order in which they are tried.
//!
//! - ALL: accepts when every sub-rule accepts, then runs every sub-action
//! - ANY: accepts on the first sub-rule that accepts, then runs only that one

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RuleError};
use crate::facts::Facts;
use crate::registry::Rules;
use crate::rule::{EvaluationContext, Rule, DEFAULT_PRIORITY};

/// Builder shared by both combinators
pub struct CompositeRuleBuilder {
    name: String,
    description: String,
    priority: i32,
    rules: Rules,
}

impl CompositeRuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            priority: DEFAULT_PRIORITY,
            rules: Rules::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a sub-rule (ignored if an equal one is already present)
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.register(rule);
        self
    }

    pub fn rule_shared(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.register_shared(rule);
        self
    }

    /// Add every rule of an existing registry
    pub fn rules(mut self, rules: Rules) -> Self {
        self.rules.extend(rules.iter().cloned());
        self
    }

    pub fn all(self) -> Result<AllCompositeRule> {
        Ok(AllCompositeRule {
            header: self.header()?,
        })
    }

    pub fn any(self) -> Result<AnyCompositeRule> {
        Ok(AnyCompositeRule {
            header: self.header()?,
        })
    }

    fn header(self) -> Result<CompositeHeader> {
        if self.name.trim().is_empty() {
            return Err(RuleError::InvalidRule(
                "composite rule name must not be empty".to_string(),
            ));
        }
        Ok(CompositeHeader {
            name: self.name,
            description: self.description,
            priority: self.priority,
            rules: self.rules,
        })
    }
}

struct CompositeHeader {
    name: String,
    description: String,
    priority: i32,
    rules: Rules,
}

impl CompositeHeader {
    fn debug(&self, kind: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(kind)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("rules", &self.rules)
            .finish()
    }
}

// ============================================================================
// ALL
// ============================================================================

/// Logical AND over sub-rules
///
/// An empty composite accepts vacuously and does nothing when executed.
pub struct AllCompositeRule {
    header: CompositeHeader,
}

impl AllCompositeRule {
    pub fn rules(&self) -> &Rules {
        &self.header.rules
    }
}

impl Rule for AllCompositeRule {
    fn name(&self) -> &str {
        &self.header.name
    }

    fn description(&self) -> &str {
        &self.header.description
    }

    fn priority(&self) -> i32 {
        self.header.priority
    }

    fn accept(&self, facts: &Facts, ctx: &mut EvaluationContext) -> Result<bool> {
        for rule in &self.header.rules {
            if !rule.accept(facts, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // Sub-conditions are not re-checked here
    fn execute(&self, facts: &mut Facts, ctx: &mut EvaluationContext) -> Result<()> {
        for rule in &self.header.rules {
            rule.execute(facts, ctx)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AllCompositeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.header.debug("AllCompositeRule", f)
    }
}

// ============================================================================
// ANY
// ============================================================================

/// Logical OR over sub-rules
///
/// `accept` remembers the first matching sub-rule in the evaluation context;
/// `execute` consumes it. An `execute` with nothing remembered is a no-op.
pub struct AnyCompositeRule {
    header: CompositeHeader,
}

impl AnyCompositeRule {
    pub fn rules(&self) -> &Rules {
        &self.header.rules
    }
}

impl Rule for AnyCompositeRule {
    fn name(&self) -> &str {
        &self.header.name
    }

    fn description(&self) -> &str {
        &self.header.description
    }

    fn priority(&self) -> i32 {
        self.header.priority
    }

    fn accept(&self, facts: &Facts, ctx: &mut EvaluationContext) -> Result<bool> {
        let key = self.key();
        // A stale match from an earlier accept must not survive a declined one
        ctx.take_match(&key);
        for rule in &self.header.rules {
            if rule.accept(facts, ctx)? {
                ctx.remember_match(key, Arc::clone(rule));
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn execute(&self, facts: &mut Facts, ctx: &mut EvaluationContext) -> Result<()> {
        match ctx.take_match(&self.key()) {
            Some(rule) => rule.execute(facts, ctx),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for AnyCompositeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.header.debug("AnyCompositeRule", f)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::builder::RuleBuilder;

    /// Sub-rule with a fixed verdict that appends its name to the "trace" fact
    fn tracing_rule(name: &'static str, priority: i32, verdict: bool) -> Arc<dyn Rule> {
        Arc::new(
            RuleBuilder::new(name)
                .priority(priority)
                .when(move |_: &Facts| Ok(verdict))
                .then(move |facts: &mut Facts| {
                    facts.get_mut::<Vec<&'static str>>("trace")?.push(name);
                    Ok(())
                })
                .build()
                .unwrap(),
        )
    }

    fn trace_facts() -> Facts {
        Facts::new().with("trace", Vec::<&'static str>::new())
    }

    fn trace(facts: &Facts) -> Vec<&'static str> {
        facts.value("trace").unwrap()
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(CompositeRuleBuilder::new("").all().is_err());
        assert!(CompositeRuleBuilder::new(" ").any().is_err());
    }

    #[test]
    fn test_composite_identity_is_its_own() {
        let rule = CompositeRuleBuilder::new("group")
            .priority(5)
            .description("grouped")
            .rule_shared(tracing_rule("a", 1, true))
            .all()
            .unwrap();

        assert_eq!(rule.name(), "group");
        assert_eq!(rule.priority(), 5);
        assert_eq!(rule.description(), "grouped");
        assert_eq!(rule.rules().len(), 1);
    }

    #[test]
    fn test_all_accepts_only_when_every_rule_accepts() {
        let mut ctx = EvaluationContext::new();
        let facts = trace_facts();

        let all_true = CompositeRuleBuilder::new("all")
            .rule_shared(tracing_rule("a", 1, true))
            .rule_shared(tracing_rule("b", 2, true))
            .all()
            .unwrap();
        assert!(all_true.accept(&facts, &mut ctx).unwrap());

        let one_false = CompositeRuleBuilder::new("all")
            .rule_shared(tracing_rule("a", 1, true))
            .rule_shared(tracing_rule("b", 2, false))
            .all()
            .unwrap();
        assert!(!one_false.accept(&facts, &mut ctx).unwrap());
    }

    #[test]
    fn test_all_short_circuits_on_first_decline() {
        let rule = CompositeRuleBuilder::new("all")
            .rule_shared(tracing_rule("a", 1, false))
            .rule(
                RuleBuilder::new("boom")
                    .priority(2)
                    .when(|_: &Facts| Err(RuleError::condition("must not be reached")))
                    .build()
                    .unwrap(),
            )
            .all()
            .unwrap();

        assert!(!rule
            .accept(&Facts::new(), &mut EvaluationContext::new())
            .unwrap());
    }

    #[test]
    fn test_all_executes_every_rule_unconditionally() {
        let rule = CompositeRuleBuilder::new("all")
            .rule_shared(tracing_rule("b", 2, false))
            .rule_shared(tracing_rule("a", 1, false))
            .all()
            .unwrap();
        let mut facts = trace_facts();

        rule.execute(&mut facts, &mut EvaluationContext::new())
            .unwrap();

        assert_eq!(trace(&facts), vec!["a", "b"]);
    }

    #[test]
    fn test_all_propagates_sub_action_failure() {
        let rule = CompositeRuleBuilder::new("all")
            .rule(
                RuleBuilder::new("fail")
                    .priority(1)
                    .then(|_: &mut Facts| Err(RuleError::action("broken")))
                    .build()
                    .unwrap(),
            )
            .rule_shared(tracing_rule("after", 2, true))
            .all()
            .unwrap();
        let mut facts = trace_facts();

        let err = rule
            .execute(&mut facts, &mut EvaluationContext::new())
            .unwrap_err();

        assert!(matches!(err, RuleError::ActionError(_)));
        assert!(trace(&facts).is_empty());
    }

    #[test]
    fn test_any_executes_only_first_match() {
        let rule = CompositeRuleBuilder::new("any")
            .rule_shared(tracing_rule("a", 1, false))
            .rule_shared(tracing_rule("b", 2, true))
            .rule_shared(tracing_rule("c", 3, true))
            .any()
            .unwrap();
        let mut facts = trace_facts();
        let mut ctx = EvaluationContext::new();

        assert!(rule.accept(&facts, &mut ctx).unwrap());
        rule.execute(&mut facts, &mut ctx).unwrap();

        assert_eq!(trace(&facts), vec!["b"]);
    }

    #[test]
    fn test_any_second_execute_is_noop() {
        let rule = CompositeRuleBuilder::new("any")
            .rule_shared(tracing_rule("a", 1, true))
            .any()
            .unwrap();
        let mut facts = trace_facts();
        let mut ctx = EvaluationContext::new();

        rule.accept(&facts, &mut ctx).unwrap();
        rule.execute(&mut facts, &mut ctx).unwrap();
        rule.execute(&mut facts, &mut ctx).unwrap();

        assert_eq!(trace(&facts), vec!["a"]);
    }

    #[test]
    fn test_any_execute_without_accept_is_noop() {
        let rule = CompositeRuleBuilder::new("any")
            .rule_shared(tracing_rule("a", 1, true))
            .any()
            .unwrap();
        let mut facts = trace_facts();

        rule.execute(&mut facts, &mut EvaluationContext::new())
            .unwrap();

        assert!(trace(&facts).is_empty());
    }

    #[test]
    fn test_any_declines_when_nothing_matches() {
        let rule = CompositeRuleBuilder::new("any")
            .rule_shared(tracing_rule("a", 1, false))
            .rule_shared(tracing_rule("b", 2, false))
            .any()
            .unwrap();
        let mut ctx = EvaluationContext::new();

        assert!(!rule.accept(&trace_facts(), &mut ctx).unwrap());
        assert!(!ctx.has_match(&rule.key()));
    }

    #[test]
    fn test_any_matches_are_isolated_per_context() {
        let rule = CompositeRuleBuilder::new("any")
            .rule_shared(tracing_rule("a", 1, true))
            .any()
            .unwrap();
        let mut facts = trace_facts();
        let mut accepted = EvaluationContext::new();
        let mut other = EvaluationContext::new();

        rule.accept(&facts, &mut accepted).unwrap();
        rule.execute(&mut facts, &mut other).unwrap();
        assert!(trace(&facts).is_empty());

        rule.execute(&mut facts, &mut accepted).unwrap();
        assert_eq!(trace(&facts), vec!["a"]);
    }
}
