//! Declarative rules - runtime half of `#[rule]`
//!
//! The attribute macro validates an annotated `impl` block at compile time
//! and implements [`DeclaredRule`] for the host type. [`DeclarativeRule`]
//! then wraps a host value and exposes it as a [`Rule`].
//!
//! ```rust
//! use rule_engine::{rule, DeclarativeRule, Facts, Rule};
//!
//! struct Greeter;
//!
//! #[rule(priority = 1)]
//! impl Greeter {
//!     #[condition]
//!     fn known(&self, #[fact("name")] name: &String) -> bool {
//!         !name.is_empty()
//!     }
//!
//!     #[action(order = 1)]
//!     fn greet(&self, #[fact("name")] name: String, facts: &mut Facts) {
//!         facts.put("greeting", format!("hello {}", name));
//!     }
//! }
//!
//! let rule = DeclarativeRule::new(Greeter).unwrap();
//! assert_eq!(rule.name(), "Greeter");
//! assert_eq!(rule.description(), "When known then greet");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RuleError};
use crate::facts::Facts;
use crate::rule::{EvaluationContext, Rule, DEFAULT_PRIORITY};

/// Static shape of a declared rule, produced by the macro
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDeclaration {
    /// Short name of the host type
    pub type_name: &'static str,
    pub name: Option<&'static str>,
    pub description: Option<&'static str>,
    pub priority: Option<i32>,
    /// Name of the `#[condition]` method
    pub condition: &'static str,
    /// Names of the `#[action]` methods in execution order
    pub actions: &'static [&'static str],
}

impl RuleDeclaration {
    /// `"When <condition> then <action1>, <action2>"`
    pub fn default_description(&self) -> String {
        format!("When {} then {}", self.condition, self.actions.join(", "))
    }
}

/// Implemented by `#[rule]` for its host type
pub trait DeclaredRule {
    fn declaration() -> RuleDeclaration;

    /// Value of the `#[name]` method, if the host has one
    fn rule_name(&self) -> Option<String> {
        None
    }

    /// Value of the `#[description]` method, if the host has one
    fn rule_description(&self) -> Option<String> {
        None
    }

    /// Value of the `#[priority]` method, if the host has one
    fn rule_priority(&self) -> Option<i32> {
        None
    }

    /// Bind the condition's parameters and call it
    fn evaluate_condition(&self, facts: &Facts) -> Result<bool>;

    /// Bind each action's parameters and call them in order
    fn execute_actions(&self, facts: &mut Facts) -> Result<()>;
}

/// Return types accepted from a `#[condition]` method
pub trait ConditionOutcome {
    fn into_outcome(self) -> Result<bool>;
}

impl ConditionOutcome for bool {
    fn into_outcome(self) -> Result<bool> {
        Ok(self)
    }
}

impl<E: Into<RuleError>> ConditionOutcome for std::result::Result<bool, E> {
    fn into_outcome(self) -> Result<bool> {
        self.map_err(Into::into)
    }
}

/// Return types accepted from an `#[action]` method
pub trait ActionOutcome {
    fn into_outcome(self) -> Result<()>;
}

impl ActionOutcome for () {
    fn into_outcome(self) -> Result<()> {
        Ok(())
    }
}

impl<E: Into<RuleError>> ActionOutcome for std::result::Result<(), E> {
    fn into_outcome(self) -> Result<()> {
        self.map_err(Into::into)
    }
}

/// A `#[rule]` host exposed as a [`Rule`]
///
/// Name, description and priority are resolved once, at construction:
/// the host's override method wins, then the attribute value, then the
/// default (type name, generated description, [`DEFAULT_PRIORITY`]).
pub struct DeclarativeRule<H> {
    host: H,
    name: String,
    description: String,
    priority: i32,
}

impl<H: DeclaredRule> DeclarativeRule<H> {
    pub fn new(host: H) -> Result<Self> {
        let declaration = H::declaration();

        let name = host
            .rule_name()
            .or_else(|| non_blank(declaration.name))
            .unwrap_or_else(|| declaration.type_name.to_string());
        if name.trim().is_empty() {
            return Err(RuleError::InvalidRule(format!(
                "rule declared on {} resolved to an empty name",
                declaration.type_name
            )));
        }

        let description = host
            .rule_description()
            .or_else(|| non_blank(declaration.description))
            .unwrap_or_else(|| declaration.default_description());
        let priority = host
            .rule_priority()
            .or(declaration.priority)
            .unwrap_or(DEFAULT_PRIORITY);

        Ok(Self {
            host,
            name,
            description,
            priority,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

impl<H: DeclaredRule + Send + Sync> Rule for DeclarativeRule<H> {
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
        match self.host.evaluate_condition(facts) {
            Ok(accepted) => Ok(accepted),
            Err(err) => {
                tracing::debug!("Rule {} not accepted: {}", self.key(), err);
                Ok(false)
            },
        }
    }

    fn execute(&self, facts: &mut Facts, _ctx: &mut EvaluationContext) -> Result<()> {
        self.host.execute_actions(facts)
    }
}

impl<H> fmt::Debug for DeclarativeRule<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarativeRule")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Adapt a `#[rule]` host into a shareable rule
pub fn as_rule<H>(host: H) -> Result<Arc<dyn Rule>>
where
    H: DeclaredRule + Send + Sync + 'static,
{
    Ok(Arc::new(DeclarativeRule::new(host)?))
}
