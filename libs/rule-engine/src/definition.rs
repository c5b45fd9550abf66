//! Rule definitions and the factory turning them into rules
//!
//! A definition is either a leaf (`when` + `then` expressions) or a
//! composite (`type` = `all`/`any` + nested `rules`). Reading definitions
//! from documents and compiling expression strings are left to the caller:
//! any serde format deserializes [`RuleDefinition`], and an
//! [`ExpressionCompiler`] supplies conditions and actions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::RuleBuilder;
use crate::composite::CompositeRuleBuilder;
use crate::error::{Result, RuleError};
use crate::registry::Rules;
use crate::rule::{Action, Condition, Rule, DEFAULT_PRIORITY};

/// Composite type names understood by [`RulesFactory`]
pub const COMPOSITE_ALL: &str = "all";
pub const COMPOSITE_ANY: &str = "any";

/// Structured description of one rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Condition expression of a leaf rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    /// Action expressions of a leaf rule, executed in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<String>,

    /// Composite type: "all" or "any"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Nested definitions of a composite rule
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleDefinition>,
}

impl RuleDefinition {
    /// Leaf definition with one condition and its actions
    pub fn leaf(
        name: impl Into<String>,
        when: impl Into<String>,
        then: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            when: Some(when.into()),
            then: then.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Composite definition over nested definitions
    pub fn composite(
        name: impl Into<String>,
        kind: impl Into<String>,
        rules: Vec<RuleDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind.into()),
            rules,
            ..Self::default()
        }
    }

    /// Whether this definition describes a composite rule
    pub fn is_composite(&self) -> bool {
        !is_defined(self.when.as_deref())
    }

    /// Check the leaf/composite shape, recursively
    ///
    /// A definition has exactly one of `when` + `then` or `type` + `rules`.
    pub fn validate(&self) -> Result<()> {
        if !is_defined(Some(self.name.as_str())) {
            return Err(self.invalid("must define 'name'"));
        }

        if self.is_composite() {
            self.validate_composite()
        } else {
            self.validate_leaf()
        }
    }

    fn validate_leaf(&self) -> Result<()> {
        if !self.rules.is_empty() {
            return Err(self.invalid("cannot define both 'when' and 'rules'"));
        }
        if self.kind.is_some() {
            return Err(self.invalid("cannot define both 'when' and 'type'"));
        }
        if self.then.is_empty() {
            return Err(self.invalid("must define at least one 'then' with 'when'"));
        }
        if self.then.iter().any(|then| !is_defined(Some(then.as_str()))) {
            return Err(self.invalid("must define non-blank 'then' with 'when'"));
        }
        Ok(())
    }

    fn validate_composite(&self) -> Result<()> {
        if !is_defined(self.kind.as_deref()) {
            return Err(self.invalid("must define 'type' with 'rules'"));
        }
        if !self.then.is_empty() {
            return Err(self.invalid("cannot define both 'then' and 'rules'"));
        }
        if self.rules.is_empty() {
            return Err(self.invalid("must define at least one 'rules' without 'when'"));
        }
        self.rules.iter().try_for_each(RuleDefinition::validate)
    }

    fn invalid(&self, reason: &str) -> RuleError {
        RuleError::InvalidDefinition(format!("{}: {:?}", reason, self.name))
    }
}

fn is_defined(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Turns expression strings into conditions and actions
///
/// Implementations back a particular expression dialect; the factory calls
/// them once per expression of every leaf definition.
pub trait ExpressionCompiler {
    fn compile_condition(&self, expression: &str) -> Result<Box<dyn Condition>>;

    fn compile_action(&self, expression: &str) -> Result<Box<dyn Action>>;
}

/// Builds rules from definitions using an expression compiler
pub struct RulesFactory<C> {
    compiler: C,
}

impl<C: ExpressionCompiler> RulesFactory<C> {
    pub fn new(compiler: C) -> Self {
        Self { compiler }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Validate and build every definition into one registry
    pub fn create(&self, definitions: &[RuleDefinition]) -> Result<Rules> {
        definitions
            .iter()
            .map(|definition| {
                definition.validate()?;
                self.to_rule(definition)
            })
            .collect()
    }

    fn to_rule(&self, definition: &RuleDefinition) -> Result<Arc<dyn Rule>> {
        if definition.is_composite() {
            self.to_composite(definition)
        } else {
            self.to_leaf(definition)
        }
    }

    fn to_leaf(&self, definition: &RuleDefinition) -> Result<Arc<dyn Rule>> {
        let condition = match definition.when.as_deref() {
            Some(when) => self.compiler.compile_condition(when)?,
            None => return Err(definition.invalid("missing 'when'")),
        };

        let mut builder = RuleBuilder::new(definition.name.as_str())
            .description(definition.description.clone().unwrap_or_default())
            .priority(definition.priority.unwrap_or(DEFAULT_PRIORITY))
            .when_condition(condition);
        for then in &definition.then {
            builder = builder.then_action(self.compiler.compile_action(then)?);
        }
        Ok(Arc::new(builder.build()?))
    }

    fn to_composite(&self, definition: &RuleDefinition) -> Result<Arc<dyn Rule>> {
        let nested = definition
            .rules
            .iter()
            .map(|nested| self.to_rule(nested))
            .collect::<Result<Rules>>()?;

        let builder = CompositeRuleBuilder::new(definition.name.as_str())
            .description(definition.description.clone().unwrap_or_default())
            .priority(definition.priority.unwrap_or(DEFAULT_PRIORITY))
            .rules(nested);

        match definition.kind.as_deref().map(str::trim) {
            Some(COMPOSITE_ALL) => Ok(Arc::new(builder.all()?)),
            Some(COMPOSITE_ANY) => Ok(Arc::new(builder.any()?)),
            other => Err(RuleError::InvalidDefinition(format!(
                "unsupported rules type {:?} on {:?}",
                other.unwrap_or_default(),
                definition.name
            ))),
        }
    }
}
