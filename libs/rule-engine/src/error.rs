//! Rule Engine Error Types

use thiserror::Error;

/// Result type for rule operations
pub type Result<T> = std::result::Result<T, RuleError>;

/// Rule engine errors
#[derive(Debug, Error)]
pub enum RuleError {
    /// Rule could not be built (blank name, bad composite)
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Rule definition failed validation
    #[error("Invalid rule definition: {0}")]
    InvalidDefinition(String),

    /// A requested fact is not present in the fact store
    #[error("Fact '{0}' was not declared")]
    UndeclaredFact(String),

    /// A fact is present but holds a value of another type
    #[error("Fact '{name}' is not of type {expected}")]
    FactTypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// Condition evaluation error
    #[error("Condition evaluation error: {0}")]
    ConditionError(String),

    /// Action execution error
    #[error("Action execution error: {0}")]
    ActionError(String),

    /// Expression could not be compiled into a condition or action
    #[error("Invalid expression: {expression}: {reason}")]
    Expression { expression: String, reason: String },

    /// Configuration or logging bootstrap error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any other failure raised from user code
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RuleError {
    /// Shorthand for a condition failure with a message
    pub fn condition(message: impl Into<String>) -> Self {
        RuleError::ConditionError(message.into())
    }

    /// Shorthand for an action failure with a message
    pub fn action(message: impl Into<String>) -> Self {
        RuleError::ActionError(message.into())
    }
}

impl From<figment::Error> for RuleError {
    fn from(err: figment::Error) -> Self {
        RuleError::Configuration(err.to_string())
    }
}
