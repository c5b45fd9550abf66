//! Fluent construction of [`DefaultRule`]

use std::any::Any;

use crate::error::{Result, RuleError};
use crate::facts::Facts;
use crate::rule::{Action, Condition, DefaultRule, DEFAULT_PRIORITY};

/// Builder for rules made of closures or compiled conditions/actions
///
/// ```rust
/// use rule_engine::{Facts, RuleBuilder};
///
/// let rule = RuleBuilder::new("hot")
///     .priority(1)
///     .when_fact("temp", |temp: &i32| *temp > 30)
///     .then(|facts: &mut Facts| {
///         facts.put("alert", true);
///         Ok(())
///     })
///     .build()
///     .unwrap();
/// ```
pub struct RuleBuilder {
    name: String,
    description: String,
    priority: i32,
    condition: Option<Box<dyn Condition>>,
    actions: Vec<Box<dyn Action>>,
}

impl RuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            priority: DEFAULT_PRIORITY,
            condition: None,
            actions: Vec::new(),
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

    /// Set the condition, replacing any previous one
    pub fn when<F>(self, condition: F) -> Self
    where
        F: Fn(&Facts) -> Result<bool> + Send + Sync + 'static,
    {
        self.when_condition(Box::new(condition))
    }

    /// Condition over a single named fact
    ///
    /// The condition fails (and the engine treats the rule as not accepted)
    /// when the fact is missing or has another type.
    pub fn when_fact<T, P>(self, fact: impl Into<String>, predicate: P) -> Self
    where
        T: Any,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let fact = fact.into();
        self.when(move |facts: &Facts| facts.get::<T>(&fact).map(&predicate))
    }

    pub fn when_condition(mut self, condition: Box<dyn Condition>) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Append an action; actions run in the order they were added
    pub fn then<F>(self, action: F) -> Self
    where
        F: Fn(&mut Facts) -> Result<()> + Send + Sync + 'static,
    {
        self.then_action(Box::new(action))
    }

    pub fn then_action(mut self, action: Box<dyn Action>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn build(self) -> Result<DefaultRule> {
        if self.name.trim().is_empty() {
            return Err(RuleError::InvalidRule(
                "rule name must not be empty".to_string(),
            ));
        }

        Ok(DefaultRule {
            name: self.name,
            description: self.description,
            priority: self.priority,
            condition: self.condition.unwrap_or_else(|| Box::new(always)),
            actions: self.actions,
        })
    }
}

fn always(_: &Facts) -> Result<bool> {
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::rule::{EvaluationContext, Rule};

    #[test]
    fn test_defaults() {
        let rule = RuleBuilder::new("plain").build().unwrap();
        let mut facts = Facts::new();
        let mut ctx = EvaluationContext::new();

        assert_eq!(rule.name(), "plain");
        assert_eq!(rule.description(), "");
        assert_eq!(rule.priority(), DEFAULT_PRIORITY);
        assert!(rule.accept(&facts, &mut ctx).unwrap());
        rule.execute(&mut facts, &mut ctx).unwrap();
        assert!(facts.is_empty());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(matches!(
            RuleBuilder::new("  ").build(),
            Err(RuleError::InvalidRule(_))
        ));
    }

    #[test]
    fn test_actions_run_in_order() {
        let rule = RuleBuilder::new("ordered")
            .then(|facts: &mut Facts| {
                facts.put("trace", vec!["first"]);
                Ok(())
            })
            .then(|facts: &mut Facts| {
                facts.get_mut::<Vec<&'static str>>("trace")?.push("second");
                Ok(())
            })
            .build()
            .unwrap();

        let mut facts = Facts::new();
        rule.execute(&mut facts, &mut EvaluationContext::new())
            .unwrap();

        assert_eq!(
            facts.value::<Vec<&'static str>>("trace").unwrap(),
            vec!["first", "second"]
        );
    }

    #[test]
    fn test_when_fact() {
        let rule = RuleBuilder::new("hot")
            .when_fact("temp", |temp: &i32| *temp > 30)
            .build()
            .unwrap();
        let mut ctx = EvaluationContext::new();

        assert!(rule
            .accept(&Facts::new().with("temp", 35_i32), &mut ctx)
            .unwrap());
        assert!(!rule
            .accept(&Facts::new().with("temp", 20_i32), &mut ctx)
            .unwrap());
        assert!(matches!(
            rule.accept(&Facts::new(), &mut ctx),
            Err(RuleError::UndeclaredFact(_))
        ));
    }
}
